//! Commit orchestrator: transactional staging and commit execution.
//!
//! The orchestrator is the only component that mutates repository state.
//! It snapshots the index before touching it, stages exactly the planned
//! selection, verifies the staged state against the plan, and rolls the
//! index back on any failure before the commit lands. A failure after the
//! commit step has run is reported as ambiguous rather than rolled back.

use std::io::Write;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::compose::CommitMessage;
use crate::error::{CommitError, ProcessError};
use crate::process::{ProcessGateway, run_checked};
use crate::scan::ChangeSet;

/// The well-known hash of the empty tree, used as the diff base in a
/// repository that has no commits yet.
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// An immutable record of what will be committed.
#[derive(Debug)]
pub struct CommitPlan {
    /// The scanned change set with final selection flags. Unselected
    /// entries and hunks are retained so partial selections can be told
    /// apart from full ones when choosing a staging strategy.
    pub changes: ChangeSet,
    pub message: CommitMessage,
    pub created_at: DateTime<Utc>,
}

impl CommitPlan {
    pub fn new(changes: ChangeSet, message: CommitMessage) -> Result<Self, CommitError> {
        if !changes.has_selection() {
            return Err(CommitError::EmptyPlan);
        }
        Ok(Self {
            changes,
            message,
            created_at: Utc::now(),
        })
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone)]
pub struct CommitResult {
    pub hash: String,
}

/// Pre-staging index state, captured so any failure can restore it.
struct IndexSnapshot {
    /// Paths that were already staged before qit touched the index.
    baseline: Vec<String>,
    /// Binary-safe patch of the staged state, written out eagerly so the
    /// rollback path never has to create files itself.
    patch_file: Option<NamedTempFile>,
}

/// Execute a commit plan transactionally.
///
/// On success the repository has exactly one new commit containing the
/// planned selection. On failure before the commit step the index is
/// restored to its snapshot and the working tree is untouched. A failure
/// while reading the outcome of the commit step itself surfaces as
/// [`CommitError::AmbiguousOutcome`] and is deliberately not rolled back.
pub async fn commit(
    gateway: &dyn ProcessGateway,
    plan: &CommitPlan,
) -> Result<CommitResult, CommitError> {
    let base = diff_base(gateway).await.map_err(CommitError::SnapshotFailed)?;
    let snapshot = snapshot_index(gateway, base).await?;

    if let Err(err) = stage_selection(gateway, plan).await {
        rollback(gateway, &snapshot, "staging").await?;
        return Err(err);
    }

    let found = match staged_paths(gateway, base).await {
        Ok(found) => found,
        Err(err) => {
            rollback(gateway, &snapshot, "staging verification").await?;
            return Err(err.into());
        }
    };
    let expected = expected_paths(&snapshot.baseline, &plan.changes);
    if found != expected {
        rollback(gateway, &snapshot, "staging verification").await?;
        return Err(CommitError::StagingDiverged { expected, found });
    }

    let message_file = write_temp_file("commit message", &plan.message.format())?;
    let message_path = message_file.path().to_string_lossy().into_owned();
    debug!("committing {} paths", expected.len());

    let output = match gateway.run(&["commit", "--file", &message_path]).await {
        Ok(output) => output,
        // Spawn failures and pre-spawn rejections mean the commit never
        // ran; that is an ordinary step failure and rolls back.
        Err(
            err @ (ProcessError::SpawnFailed(_)
            | ProcessError::Cancelled { .. }
            | ProcessError::GitNotInstalled),
        ) => {
            rollback(gateway, &snapshot, "commit").await?;
            return Err(CommitError::CommitFailed {
                stderr: err.to_string(),
            });
        }
        // A timeout (or unreadable output) means the child ran and may
        // have completed; leave the index alone and make the user look.
        Err(err) => {
            return Err(CommitError::AmbiguousOutcome {
                detail: err.to_string(),
            });
        }
    };
    if !output.success() {
        rollback(gateway, &snapshot, "commit").await?;
        return Err(CommitError::CommitFailed {
            stderr: output.stderr.trim().to_string(),
        });
    }

    match run_checked(gateway, &["rev-parse", "HEAD"]).await {
        Ok(output) => Ok(CommitResult {
            hash: output.stdout.trim().to_string(),
        }),
        Err(err) => Err(CommitError::AmbiguousOutcome {
            detail: format!("could not resolve the new commit hash: {err}"),
        }),
    }
}

/// `HEAD` when the repository has commits, the empty tree otherwise.
async fn diff_base(gateway: &dyn ProcessGateway) -> Result<&'static str, ProcessError> {
    let head = gateway
        .run(&["rev-parse", "--verify", "--quiet", "HEAD"])
        .await?;
    Ok(if head.success() { "HEAD" } else { EMPTY_TREE })
}

async fn snapshot_index(
    gateway: &dyn ProcessGateway,
    base: &str,
) -> Result<IndexSnapshot, CommitError> {
    let patch = run_checked(gateway, &["diff", "--cached", "--binary", base])
        .await
        .map_err(CommitError::SnapshotFailed)?;
    let baseline = staged_paths(gateway, base)
        .await
        .map_err(CommitError::SnapshotFailed)?;

    let patch_file = if patch.stdout.trim().is_empty() {
        None
    } else {
        Some(write_temp_file("index snapshot", &patch.stdout)?)
    };

    Ok(IndexSnapshot {
        baseline,
        patch_file,
    })
}

/// Stage every selected entry: whole files through `git add`, partial
/// selections through a rebuilt patch applied to the index only.
async fn stage_selection(
    gateway: &dyn ProcessGateway,
    plan: &CommitPlan,
) -> Result<(), CommitError> {
    for entry in plan.changes.entries.iter().filter(|e| e.selected) {
        if entry.is_partially_selected() {
            let patch = build_patch(entry);
            let patch_file = write_temp_file("staging patch", &patch)?;
            let patch_path = patch_file.path().to_string_lossy().into_owned();
            run_checked(gateway, &["apply", "--cached", &patch_path])
                .await
                .map_err(|source| CommitError::StagingFailed {
                    path: entry.path.clone(),
                    source,
                })?;
        } else {
            let mut args = vec!["add", "-A", "--"];
            if let Some(ref old) = entry.old_path {
                args.push(old);
            }
            args.push(&entry.path);
            run_checked(gateway, &args)
                .await
                .map_err(|source| CommitError::StagingFailed {
                    path: entry.path.clone(),
                    source,
                })?;
        }
    }
    Ok(())
}

/// Rebuild an apply-able patch from an entry's header and selected hunks.
fn build_patch(entry: &crate::scan::ChangeEntry) -> String {
    let mut patch = entry.file_header.trim_end().to_string();
    for hunk in entry.hunks.iter().filter(|h| h.selected) {
        patch.push('\n');
        patch.push_str(hunk.diff_text().trim_end());
    }
    patch.push('\n');
    patch
}

/// Sorted, deduplicated paths currently staged against `base`.
///
/// Rename sources show up as staged deletions, so they are listed too.
async fn staged_paths(
    gateway: &dyn ProcessGateway,
    base: &str,
) -> Result<Vec<String>, ProcessError> {
    let output = run_checked(gateway, &["diff", "--cached", "--name-only", base]).await?;
    let mut paths: Vec<String> = output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    paths.sort();
    paths.dedup();
    Ok(paths)
}

/// The set of paths that must be staged after staging succeeds: whatever
/// was staged before, plus the planned selection and any rename sources.
fn expected_paths(baseline: &[String], changes: &ChangeSet) -> Vec<String> {
    let mut paths: Vec<String> = baseline.to_vec();
    for entry in changes.entries.iter().filter(|e| e.selected) {
        paths.push(entry.path.clone());
        if let Some(ref old) = entry.old_path {
            paths.push(old.clone());
        }
    }
    paths.sort();
    paths.dedup();
    paths
}

/// Restore the index to its snapshot: unstage everything, then re-apply
/// the captured staged state.
async fn rollback(
    gateway: &dyn ProcessGateway,
    snapshot: &IndexSnapshot,
    during: &str,
) -> Result<(), CommitError> {
    warn!("rolling back the index after a failure during {during}");

    run_checked(gateway, &["reset"])
        .await
        .map_err(|source| CommitError::RollbackFailed {
            during: during.to_string(),
            source,
        })?;

    if let Some(ref patch_file) = snapshot.patch_file {
        let patch_path = patch_file.path().to_string_lossy().into_owned();
        run_checked(gateway, &["apply", "--cached", &patch_path])
            .await
            .map_err(|source| CommitError::RollbackFailed {
                during: during.to_string(),
                source,
            })?;
    }
    Ok(())
}

fn write_temp_file(purpose: &'static str, content: &str) -> Result<NamedTempFile, CommitError> {
    let mut file = NamedTempFile::new().map_err(|source| CommitError::TempFile {
        purpose,
        source,
    })?;
    file.write_all(content.as_bytes())
        .map_err(|source| CommitError::TempFile { purpose, source })?;
    file.flush()
        .map_err(|source| CommitError::TempFile { purpose, source })?;
    Ok(file)
}
