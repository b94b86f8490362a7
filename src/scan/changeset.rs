//! Working-tree change model: entries, hunks, and selection state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Binary,
}

impl ChangeKind {
    /// Whether this kind carries an old path alongside the new one.
    pub fn has_old_path(self) -> bool {
        matches!(self, Self::Renamed | Self::Copied)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Binary => "binary",
        };
        write!(f, "{}", label)
    }
}

/// A contiguous block of changed lines, the minimal unit of partial staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// Start line on the old side of the diff.
    pub old_start: u32,
    /// Line count on the old side.
    pub old_lines: u32,
    /// Start line on the new side of the diff.
    pub new_start: u32,
    /// Line count on the new side.
    pub new_lines: u32,
    /// The `@@` header line, verbatim.
    pub header: String,
    /// The hunk body: context, `+`, and `-` lines.
    pub body: String,
    /// Whether the selector has picked this hunk.
    pub selected: bool,
}

impl Hunk {
    /// The full diff text of this hunk (header plus body).
    pub fn diff_text(&self) -> String {
        format!("{}\n{}", self.header, self.body)
    }

    /// Count of `+` lines in the body.
    pub fn additions(&self) -> usize {
        self.body.lines().filter(|l| l.starts_with('+')).count()
    }

    /// Count of `-` lines in the body.
    pub fn deletions(&self) -> usize {
        self.body.lines().filter(|l| l.starts_with('-')).count()
    }
}

/// One changed path with its hunks and selection state.
#[derive(Debug, Clone)]
pub struct ChangeEntry {
    pub path: String,
    pub kind: ChangeKind,
    /// Present iff `kind` is renamed or copied.
    pub old_path: Option<String>,
    /// The `diff --git` header block, kept so apply-able patches can be
    /// rebuilt for partial staging.
    pub file_header: String,
    pub hunks: Vec<Hunk>,
    /// File-level selection flag. With hunks present it mirrors "at least
    /// one hunk selected"; binary and hunk-less entries toggle it directly.
    pub selected: bool,
}

impl ChangeEntry {
    pub fn new(path: impl Into<String>, kind: ChangeKind, old_path: Option<String>) -> Self {
        debug_assert_eq!(kind.has_old_path(), old_path.is_some());
        Self {
            path: path.into(),
            kind,
            old_path,
            file_header: String::new(),
            hunks: Vec::new(),
            selected: false,
        }
    }

    /// Fully selected: every hunk selected (or the flag itself when there
    /// are no hunks).
    pub fn is_fully_selected(&self) -> bool {
        if self.hunks.is_empty() {
            self.selected
        } else {
            self.hunks.iter().all(|h| h.selected)
        }
    }

    /// Partially selected: some but not all hunks selected.
    pub fn is_partially_selected(&self) -> bool {
        !self.hunks.is_empty()
            && self.hunks.iter().any(|h| h.selected)
            && !self.hunks.iter().all(|h| h.selected)
    }

    /// Number of currently selected hunks.
    pub fn selected_hunk_count(&self) -> usize {
        self.hunks.iter().filter(|h| h.selected).count()
    }

    /// Set every hunk and the entry flag to `selected`.
    pub fn set_selected(&mut self, selected: bool) {
        for hunk in &mut self.hunks {
            hunk.selected = selected;
        }
        self.selected = selected;
    }

    /// Toggle one hunk and resync the entry flag (selected iff any hunk is).
    ///
    /// Returns false when the index is out of range.
    pub fn toggle_hunk(&mut self, index: usize) -> bool {
        let Some(hunk) = self.hunks.get_mut(index) else {
            return false;
        };
        hunk.selected = !hunk.selected;
        self.selected = self.hunks.iter().any(|h| h.selected);
        true
    }

    /// Total changed lines across all hunks.
    pub fn changed_lines(&self) -> usize {
        self.hunks
            .iter()
            .map(|h| h.additions() + h.deletions())
            .sum()
    }

    /// Whether any hunk removes lines.
    pub fn has_deletions(&self) -> bool {
        self.hunks.iter().any(|h| h.deletions() > 0)
    }
}

impl fmt::Display for ChangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.old_path {
            Some(old) => write!(f, "{} -> {} ({})", old, self.path, self.kind),
            None => write!(f, "{} ({})", self.path, self.kind),
        }
    }
}

/// Ordered set of pending changes, built fresh per invocation.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    pub fn new(entries: Vec<ChangeEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether at least one hunk (or hunk-less entry) is selected.
    pub fn has_selection(&self) -> bool {
        self.entries.iter().any(|e| {
            if e.hunks.is_empty() {
                e.selected
            } else {
                e.hunks.iter().any(|h| h.selected)
            }
        })
    }

    /// Paths of all selected entries, in change-set order.
    pub fn selected_paths(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.path.clone())
            .collect()
    }

    /// Reduce to the selected subset: unselected entries are dropped and
    /// unselected hunks removed from partially selected entries.
    pub fn into_selection(self) -> ChangeSet {
        let entries = self
            .entries
            .into_iter()
            .filter(|e| e.selected)
            .map(|mut e| {
                e.hunks.retain(|h| h.selected);
                e
            })
            .collect();
        ChangeSet { entries }
    }
}
