//! Terminal front-end for the selector state machine.
//!
//! [`SelectorPrompt`] is the seam between the pure FSM and the terminal:
//! the production implementation renders dialoguer menus, tests feed
//! scripted actions through a mock.

use dialoguer::{MultiSelect, Select};
use tracing::debug;

use crate::error::SelectError;
use crate::scan::{ChangeEntry, ChangeSet};
use crate::select::{SelectorAction, SelectorSession, SelectorState};

/// Supplies the next batch of actions for the current selector state.
#[cfg_attr(test, mockall::automock)]
pub trait SelectorPrompt {
    fn next_actions(
        &mut self,
        session: &SelectorSession,
    ) -> Result<Vec<SelectorAction>, SelectError>;
}

/// Drive a session to a terminal state with the given prompt.
///
/// Returns the change set with final selection flags on confirmation,
/// `None` on cancellation. Rejected transitions are logged and the user
/// is re-prompted.
pub fn run_selection(
    changes: ChangeSet,
    prompt: &mut dyn SelectorPrompt,
) -> Result<Option<ChangeSet>, SelectError> {
    let mut session = SelectorSession::new(changes);

    while !session.state().is_terminal() {
        let actions = prompt.next_actions(&session)?;
        for action in actions {
            if let Err(rejected) = session.apply(action) {
                debug!("Rejected selector action {:?}: {}", action, rejected);
            }
            if session.state().is_terminal() {
                break;
            }
        }
    }

    Ok(session.finish())
}

/// Production prompt backed by dialoguer menus.
#[derive(Default)]
pub struct DialoguerPrompt;

impl DialoguerPrompt {
    fn browse(&self, changes: &ChangeSet) -> Result<Vec<SelectorAction>, SelectError> {
        let entry_count = changes.entries.len();
        let mut items: Vec<String> = changes.entries.iter().map(entry_row).collect();
        items.push("Review hunks of a file".to_string());
        items.push("Commit selected changes".to_string());
        items.push("Cancel".to_string());

        let choice = Select::new()
            .with_prompt("Toggle files, review hunks, or commit")
            .items(&items)
            .default(0)
            .interact_opt()?;

        let Some(index) = choice else {
            // Esc abandons the session.
            return Ok(vec![SelectorAction::Cancel]);
        };

        if index < entry_count {
            return Ok(vec![SelectorAction::ToggleEntry(index)]);
        }
        match index - entry_count {
            0 => self.pick_entry_for_review(changes),
            1 => Ok(vec![SelectorAction::Confirm]),
            _ => Ok(vec![SelectorAction::Cancel]),
        }
    }

    fn pick_entry_for_review(&self, changes: &ChangeSet) -> Result<Vec<SelectorAction>, SelectError> {
        let reviewable: Vec<usize> = changes
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.hunks.is_empty())
            .map(|(i, _)| i)
            .collect();

        if reviewable.is_empty() {
            return Ok(Vec::new());
        }

        let items: Vec<String> = reviewable
            .iter()
            .map(|&i| entry_row(&changes.entries[i]))
            .collect();

        let choice = Select::new()
            .with_prompt("Pick a file to review hunk by hunk")
            .items(&items)
            .default(0)
            .interact_opt()?;

        Ok(match choice {
            Some(picked) => vec![SelectorAction::EnterHunkReview(reviewable[picked])],
            None => Vec::new(),
        })
    }

    fn review_hunks(&self, entry: &ChangeEntry) -> Result<Vec<SelectorAction>, SelectError> {
        let items: Vec<String> = entry.hunks.iter().map(hunk_row).collect();
        let defaults: Vec<bool> = entry.hunks.iter().map(|h| h.selected).collect();

        let picked = MultiSelect::new()
            .with_prompt(format!("Select hunks of {}", entry.path))
            .items(&items)
            .defaults(&defaults)
            .interact_opt()?;

        let mut actions = Vec::new();
        if let Some(picked) = picked {
            for (index, was_selected) in defaults.iter().enumerate() {
                let now_selected = picked.contains(&index);
                if now_selected != *was_selected {
                    actions.push(SelectorAction::ToggleHunk(index));
                }
            }
        }
        actions.push(SelectorAction::LeaveHunkReview);
        Ok(actions)
    }
}

impl SelectorPrompt for DialoguerPrompt {
    fn next_actions(
        &mut self,
        session: &SelectorSession,
    ) -> Result<Vec<SelectorAction>, SelectError> {
        match session.state() {
            SelectorState::Browsing => self.browse(session.changes()),
            SelectorState::HunkReview(index) => {
                self.review_hunks(&session.changes().entries[index])
            }
            // The driver loop never asks for actions in a terminal state.
            SelectorState::Confirmed | SelectorState::Cancelled => Ok(Vec::new()),
        }
    }
}

/// One-line menu row for a change entry.
fn entry_row(entry: &ChangeEntry) -> String {
    let marker = if entry.is_fully_selected() && entry.selected {
        "[x]"
    } else if entry.selected {
        "[~]"
    } else {
        "[ ]"
    };

    if entry.hunks.is_empty() {
        format!("{marker} {entry}")
    } else {
        format!(
            "{marker} {entry}, {}/{} hunks",
            entry.selected_hunk_count(),
            entry.hunks.len()
        )
    }
}

/// One-line menu row for a hunk.
fn hunk_row(hunk: &crate::scan::Hunk) -> String {
    format!("{} (+{}/-{})", hunk.header, hunk.additions(), hunk.deletions())
}
