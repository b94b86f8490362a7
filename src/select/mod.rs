//! Interactive selector: an explicit finite state machine over one
//! change set.
//!
//! The machine is pure and total: every action either transitions or is
//! rejected with a reason, independent of any rendering technology. The
//! dialoguer-driven UI lives in [`ui`] and only feeds actions in.

pub mod ui;

use std::fmt;

use crate::scan::ChangeSet;

/// Selector states. `Confirmed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Browsing,
    /// Reviewing the hunks of the entry at this index.
    HunkReview(usize),
    Confirmed,
    Cancelled,
}

impl SelectorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled)
    }
}

/// Actions the UI can feed into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorAction {
    /// Flip an entry's full selection (all hunks).
    ToggleEntry(usize),
    /// Enter hunk review for an entry.
    EnterHunkReview(usize),
    /// Flip one hunk of the entry under review.
    ToggleHunk(usize),
    /// Return from hunk review to browsing.
    LeaveHunkReview,
    /// Finish with the current selection. Rejected when nothing is selected.
    Confirm,
    /// Abandon the session. Always allowed outside terminal states.
    Cancel,
}

/// A rejected transition; the state is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// One interactive session over a change set.
#[derive(Debug)]
pub struct SelectorSession {
    changes: ChangeSet,
    state: SelectorState,
}

impl SelectorSession {
    pub fn new(changes: ChangeSet) -> Self {
        Self {
            changes,
            state: SelectorState::Browsing,
        }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Apply one action. On rejection the state and selection are unchanged.
    pub fn apply(&mut self, action: SelectorAction) -> Result<(), InvalidTransition> {
        match (self.state, action) {
            (SelectorState::Browsing, SelectorAction::ToggleEntry(index)) => {
                let entry = self
                    .changes
                    .entries
                    .get_mut(index)
                    .ok_or(InvalidTransition {
                        reason: "no such entry",
                    })?;
                let target = !entry.is_fully_selected();
                entry.set_selected(target);
                Ok(())
            }
            (SelectorState::Browsing, SelectorAction::EnterHunkReview(index)) => {
                let entry = self.changes.entries.get(index).ok_or(InvalidTransition {
                    reason: "no such entry",
                })?;
                if entry.hunks.is_empty() {
                    return Err(InvalidTransition {
                        reason: "entry has no hunks to review",
                    });
                }
                self.state = SelectorState::HunkReview(index);
                Ok(())
            }
            (SelectorState::Browsing, SelectorAction::Confirm) => {
                if !self.changes.has_selection() {
                    return Err(InvalidTransition {
                        reason: "nothing selected",
                    });
                }
                self.state = SelectorState::Confirmed;
                Ok(())
            }
            (SelectorState::HunkReview(entry_index), SelectorAction::ToggleHunk(hunk_index)) => {
                let entry = &mut self.changes.entries[entry_index];
                if entry.toggle_hunk(hunk_index) {
                    Ok(())
                } else {
                    Err(InvalidTransition {
                        reason: "no such hunk",
                    })
                }
            }
            (SelectorState::HunkReview(_), SelectorAction::LeaveHunkReview) => {
                self.state = SelectorState::Browsing;
                Ok(())
            }
            (SelectorState::Browsing | SelectorState::HunkReview(_), SelectorAction::Cancel) => {
                self.state = SelectorState::Cancelled;
                Ok(())
            }
            (SelectorState::Confirmed | SelectorState::Cancelled, _) => Err(InvalidTransition {
                reason: "session already finished",
            }),
            _ => Err(InvalidTransition {
                reason: "action not allowed in this state",
            }),
        }
    }

    /// Consume the session. `Some(changes)` with final selection flags when
    /// confirmed, `None` when cancelled.
    ///
    /// Panics on non-terminal states; drivers loop until terminal.
    pub fn finish(self) -> Option<ChangeSet> {
        match self.state {
            SelectorState::Confirmed => Some(self.changes),
            SelectorState::Cancelled => None,
            state => panic!("finish() on non-terminal selector state {state:?}"),
        }
    }
}
