//! Commit message composition.
//!
//! Aggregates per-entry classifications into one conventional commit
//! message: `[emoji ]type[(scope)]: summary` with an optional body.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classify::{Classification, CommitType};
use crate::config::{Config, SUMMARY_MAX_LEN};
use crate::error::ComposeError;
use crate::scan::ChangeSet;

/// A composed, conventionally formatted commit message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitMessage {
    pub commit_type: CommitType,
    /// Never set when emoji emission is disabled by configuration.
    pub emoji: Option<String>,
    pub scope: Option<String>,
    pub summary: String,
    pub body: Option<String>,
}

impl CommitMessage {
    /// Format the message for git.
    ///
    /// Produces:
    /// ```text
    /// 🐛 fix(src): correct null check
    ///
    /// Body text explaining why.
    /// ```
    pub fn format(&self) -> String {
        let mut subject = String::new();
        if let Some(ref emoji) = self.emoji {
            subject.push_str(emoji);
            subject.push(' ');
        }
        subject.push_str(self.commit_type.as_str());
        if let Some(ref scope) = self.scope {
            subject.push('(');
            subject.push_str(scope);
            subject.push(')');
        }
        subject.push_str(": ");
        subject.push_str(&self.summary);

        match self.body.as_deref().map(str::trim) {
            Some(body) if !body.is_empty() => format!("{subject}\n\n{body}"),
            _ => subject,
        }
    }
}

/// Fixed type-to-emoji table, inspired by https://gitmoji.dev/.
pub fn emoji_for(commit_type: CommitType) -> &'static str {
    match commit_type {
        CommitType::Feat => "✨",
        CommitType::Fix => "🐛",
        CommitType::Docs => "📝",
        CommitType::Refactor => "♻️",
        CommitType::Test => "✅",
        CommitType::Chore => "🚧",
        CommitType::Style => "🎨",
        CommitType::Perf => "⚡️",
        CommitType::Build => "📦",
    }
}

/// Compose a commit message from the selected entries.
///
/// The aggregate type is a plurality vote over the classifications of
/// selected entries; ties fall to the fixed priority order. The summary is
/// always user-supplied; this function never fabricates one.
pub fn compose(
    changes: &ChangeSet,
    classifications: &[Classification],
    summary: &str,
    body: Option<&str>,
    config: &Config,
) -> Result<CommitMessage, ComposeError> {
    let summary = validate_summary(summary)?;

    let selected: Vec<&Classification> = classifications
        .iter()
        .filter(|c| {
            changes
                .entries
                .get(c.entry_index)
                .is_some_and(|e| e.selected)
        })
        .collect();

    let commit_type = aggregate_type(&selected);
    let scope = derive_scope(changes, &selected, commit_type);
    let emoji = if config.emojis_disabled {
        None
    } else {
        Some(emoji_for(commit_type).to_string())
    };

    Ok(CommitMessage {
        commit_type,
        emoji,
        scope,
        summary,
        body: body
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(String::from),
    })
}

fn validate_summary(summary: &str) -> Result<String, ComposeError> {
    let trimmed = summary.trim();
    if trimmed.is_empty() {
        return Err(ComposeError::EmptySummary);
    }
    if trimmed.contains('\n') {
        return Err(ComposeError::MultilineSummary);
    }
    if trimmed.chars().count() > SUMMARY_MAX_LEN {
        return Err(ComposeError::SummaryTooLong {
            len: trimmed.chars().count(),
            max: SUMMARY_MAX_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// Plurality vote with fixed-priority tie-break.
fn aggregate_type(selected: &[&Classification]) -> CommitType {
    let mut votes: HashMap<CommitType, usize> = HashMap::new();
    for classification in selected {
        *votes.entry(classification.commit_type).or_insert(0) += 1;
    }

    votes
        .into_iter()
        .max_by_key(|&(ty, count)| (count, ty.priority()))
        .map(|(ty, _)| ty)
        .unwrap_or(CommitType::Chore)
}

/// Scope: the shared leading path component of the selected entries that
/// voted for the winning type, omitted when ambiguous or absent.
fn derive_scope(
    changes: &ChangeSet,
    selected: &[&Classification],
    winner: CommitType,
) -> Option<String> {
    let mut shared: Option<&str> = None;

    for classification in selected {
        if classification.commit_type != winner {
            continue;
        }
        let path = changes.entries[classification.entry_index].path.as_str();
        // A file at the repository root has no directory to name.
        let component = path.split_once('/')?.0;

        match shared {
            None => shared = Some(component),
            Some(existing) if existing == component => {}
            Some(_) => return None,
        }
    }

    shared.map(String::from)
}
