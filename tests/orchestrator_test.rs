//! Orchestrator transaction tests driven by a scripted gateway.
//!
//! These pin down the exact git command sequences for the failure paths
//! that are awkward to produce against a real repository.

mod common;

use std::time::Duration;

use qit::classify::CommitType;
use qit::commit::{CommitPlan, commit};
use qit::compose::CommitMessage;
use qit::error::{CommitError, ProcessError, SelectError};
use qit::scan::{ChangeEntry, ChangeKind, ChangeSet, Scanner};
use qit::select::ui::{SelectorPrompt, run_selection};
use qit::select::{SelectorAction, SelectorSession};

use common::ScriptedGateway;

fn plan_for(path: &str) -> CommitPlan {
    let mut entry = ChangeEntry::new(path, ChangeKind::Modified, None);
    entry.set_selected(true);
    let message = CommitMessage {
        commit_type: CommitType::Fix,
        emoji: None,
        scope: None,
        summary: "correct null check".to_string(),
        body: None,
    };
    CommitPlan::new(ChangeSet::new(vec![entry]), message).unwrap()
}

fn subcommands(calls: &[Vec<String>]) -> Vec<&str> {
    calls.iter().filter_map(|c| c.first()).map(String::as_str).collect()
}

#[tokio::test]
async fn test_success_path_command_sequence() {
    let gateway = ScriptedGateway::new()
        .on(&["diff", "--cached", "--name-only"], 0, "", "")
        .on(&["diff", "--cached", "--name-only"], 0, "a.txt\n", "")
        .on(&["rev-parse", "HEAD"], 0, "0123456789abcdef0123456789abcdef01234567\n", "");

    let result = commit(&gateway, &plan_for("a.txt")).await.unwrap();
    assert_eq!(result.hash, "0123456789abcdef0123456789abcdef01234567");

    assert_eq!(
        subcommands(&gateway.calls()),
        vec![
            "rev-parse", // does HEAD exist
            "diff",      // index snapshot
            "diff",      // baseline paths
            "add",       // stage the selection
            "diff",      // verify staged paths
            "commit",
            "rev-parse", // resolve the new hash
        ]
    );
}

#[tokio::test]
async fn test_commit_failure_rolls_back_to_snapshot() {
    let gateway = ScriptedGateway::new()
        // Something was already staged before qit ran.
        .on(
            &["diff", "--cached", "--binary"],
            0,
            "diff --git a/pre.txt b/pre.txt\nindex 111..222 100644\n--- a/pre.txt\n+++ b/pre.txt\n@@ -1 +1 @@\n-x\n+y\n",
            "",
        )
        .on(&["diff", "--cached", "--name-only"], 0, "pre.txt\n", "")
        .on(&["diff", "--cached", "--name-only"], 0, "a.txt\npre.txt\n", "")
        .on(&["commit"], 1, "", "pre-commit hook declined");

    let err = commit(&gateway, &plan_for("a.txt")).await.unwrap_err();
    match err {
        CommitError::CommitFailed { stderr } => assert!(stderr.contains("hook declined")),
        other => panic!("expected CommitFailed, got {other:?}"),
    }

    // After the failed commit the index is reset and the snapshot patch
    // re-applied.
    let calls = gateway.calls();
    let subs = subcommands(&calls);
    let commit_pos = subs.iter().position(|s| *s == "commit").unwrap();
    assert_eq!(&subs[commit_pos..], &["commit", "reset", "apply"]);
}

#[tokio::test]
async fn test_staging_failure_rolls_back_and_reports_path() {
    let gateway = ScriptedGateway::new()
        .on(&["add"], 1, "", "unable to write index");

    let err = commit(&gateway, &plan_for("a.txt")).await.unwrap_err();
    match err {
        CommitError::StagingFailed { path, .. } => assert_eq!(path, "a.txt"),
        other => panic!("expected StagingFailed, got {other:?}"),
    }

    let calls = gateway.calls();
    let subs = subcommands(&calls);
    assert!(subs.contains(&"reset"));
    assert!(!subs.contains(&"commit"));
}

#[tokio::test]
async fn test_staging_divergence_rolls_back_without_committing() {
    let gateway = ScriptedGateway::new()
        .on(&["diff", "--cached", "--name-only"], 0, "", "")
        .on(&["diff", "--cached", "--name-only"], 0, "unexpected.txt\n", "");

    let err = commit(&gateway, &plan_for("a.txt")).await.unwrap_err();
    match err {
        CommitError::StagingDiverged { expected, found } => {
            assert_eq!(expected, vec!["a.txt".to_string()]);
            assert_eq!(found, vec!["unexpected.txt".to_string()]);
        }
        other => panic!("expected StagingDiverged, got {other:?}"),
    }

    let calls = gateway.calls();
    let subs = subcommands(&calls);
    assert!(subs.contains(&"reset"));
    assert!(!subs.contains(&"commit"));
}

#[tokio::test]
async fn test_commit_spawn_failure_rolls_back_as_ordinary_failure() {
    let gateway = ScriptedGateway::new()
        .on(&["diff", "--cached", "--name-only"], 0, "", "")
        .on(&["diff", "--cached", "--name-only"], 0, "a.txt\n", "")
        .on_failure(&["commit"], || {
            ProcessError::SpawnFailed(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "git vanished",
            ))
        });

    // The commit definitively never ran, so this is a step failure with a
    // rollback, not an ambiguous outcome.
    let err = commit(&gateway, &plan_for("a.txt")).await.unwrap_err();
    match err {
        CommitError::CommitFailed { stderr } => assert!(stderr.contains("git vanished")),
        other => panic!("expected CommitFailed, got {other:?}"),
    }

    let calls = gateway.calls();
    let subs = subcommands(&calls);
    let commit_pos = subs.iter().position(|s| *s == "commit").unwrap();
    assert!(subs[commit_pos..].contains(&"reset"));
}

#[tokio::test]
async fn test_commit_timeout_is_ambiguous_and_not_rolled_back() {
    let gateway = ScriptedGateway::new()
        .on(&["diff", "--cached", "--name-only"], 0, "", "")
        .on(&["diff", "--cached", "--name-only"], 0, "a.txt\n", "")
        .on_failure(&["commit"], || ProcessError::Timeout {
            operation: "commit".to_string(),
            timeout: Duration::from_secs(1),
        });

    let err = commit(&gateway, &plan_for("a.txt")).await.unwrap_err();
    assert!(matches!(err, CommitError::AmbiguousOutcome { .. }));

    let calls = gateway.calls();
    let subs = subcommands(&calls);
    assert!(!subs.contains(&"reset"));
}

struct CancellingPrompt;

impl SelectorPrompt for CancellingPrompt {
    fn next_actions(
        &mut self,
        _session: &SelectorSession,
    ) -> Result<Vec<SelectorAction>, SelectError> {
        Ok(vec![SelectorAction::Cancel])
    }
}

#[tokio::test]
async fn test_cancel_at_browsing_records_no_mutating_calls() {
    let gateway = ScriptedGateway::new()
        .on(&["rev-parse", "--is-inside-work-tree"], 0, "true\n", "")
        .on(&["status"], 0, " M a.txt\n", "")
        .on(
            &["diff", "HEAD"],
            0,
            "diff --git a/a.txt b/a.txt\nindex 111..222 100644\n--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-x\n+y\n",
            "",
        );

    let changes = Scanner::new(&gateway).scan().await.unwrap();
    assert_eq!(changes.len(), 1);

    let outcome = run_selection(changes, &mut CancellingPrompt).unwrap();
    assert!(outcome.is_none());

    // Scanning is read-only and the orchestrator was never reached.
    assert!(gateway.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_unreadable_outcome_is_ambiguous_and_not_rolled_back() {
    let gateway = ScriptedGateway::new()
        .on(&["diff", "--cached", "--name-only"], 0, "", "")
        .on(&["diff", "--cached", "--name-only"], 0, "a.txt\n", "")
        .on(&["rev-parse", "HEAD"], 128, "", "fatal: unable to read HEAD");

    let err = commit(&gateway, &plan_for("a.txt")).await.unwrap_err();
    assert!(matches!(err, CommitError::AmbiguousOutcome { .. }));

    // The commit step ran; the index must be left for manual inspection.
    let calls = gateway.calls();
    let subs = subcommands(&calls);
    assert!(subs.contains(&"commit"));
    assert!(!subs.contains(&"reset"));
}
