//! Change scanner: enumerate pending modifications through the gateway.
//!
//! Read-only: the scanner issues status/diff invocations only and never
//! mutates the index or working tree. Repeated scans with no intervening
//! mutation yield equal change sets.

pub mod changeset;
pub mod parser;

use std::collections::HashMap;

use crate::error::ScanError;
use crate::process::{ProcessGateway, run_checked};

pub use changeset::{ChangeEntry, ChangeKind, ChangeSet, Hunk};
pub use parser::{FileDiff, StatusRecord};

/// Scans the working tree into a [`ChangeSet`].
pub struct Scanner<'a> {
    gateway: &'a dyn ProcessGateway,
}

impl<'a> Scanner<'a> {
    pub fn new(gateway: &'a dyn ProcessGateway) -> Self {
        Self { gateway }
    }

    /// Enumerate all pending changes, tracked and untracked, with hunks.
    pub async fn scan(&self) -> Result<ChangeSet, ScanError> {
        self.ensure_repository().await?;

        // Untracked files are listed individually, never as directories.
        let status = run_checked(
            self.gateway,
            &["status", "--porcelain", "--untracked-files=all"],
        )
        .await?;
        let records = parser::parse_status(&status.stdout)?;
        if records.is_empty() {
            return Ok(ChangeSet::default());
        }

        let diff_output = self.tracked_diff().await?;
        let mut diffs_by_path: HashMap<String, FileDiff> = parser::parse_diff(&diff_output)?
            .into_iter()
            .map(|d| (d.path.clone(), d))
            .collect();

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let mut entry = ChangeEntry::new(
                record.path.clone(),
                record.kind,
                record.old_path.clone(),
            );

            let diff = match diffs_by_path.remove(&record.path) {
                Some(diff) => Some(diff),
                // New files (untracked or staged in an unborn repo) don't
                // appear in the tracked diff; synthesize one.
                None if record.kind == ChangeKind::Added => {
                    self.untracked_diff(&record.path).await?
                }
                None => None,
            };

            if let Some(diff) = diff {
                entry.file_header = diff.header;
                entry.hunks = diff.hunks;
                if diff.is_binary && entry.old_path.is_none() {
                    entry.kind = ChangeKind::Binary;
                }
            }

            entries.push(entry);
        }

        Ok(ChangeSet::new(entries))
    }

    async fn ensure_repository(&self) -> Result<(), ScanError> {
        let output = self
            .gateway
            .run(&["rev-parse", "--is-inside-work-tree"])
            .await?;
        if !output.success() || output.stdout.trim() != "true" {
            return Err(ScanError::NotARepository);
        }
        Ok(())
    }

    /// Diff of tracked files against HEAD, or against the index when the
    /// repository has no commits yet.
    async fn tracked_diff(&self) -> Result<String, ScanError> {
        let head = self
            .gateway
            .run(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .await?;

        let args: &[&str] = if head.success() {
            &["diff", "HEAD"]
        } else {
            &["diff"]
        };
        let output = run_checked(self.gateway, args).await?;
        Ok(output.stdout)
    }

    /// Diff a new file against /dev/null and rewrite the header into
    /// standard new-file form so the result is apply-able later.
    ///
    /// `git diff --no-index` exits with 1 when the files differ, which is
    /// the expected case here.
    async fn untracked_diff(&self, path: &str) -> Result<Option<FileDiff>, ScanError> {
        let output = self
            .gateway
            .run(&["diff", "--no-index", "--", "/dev/null", path])
            .await?;

        if output.exit_code != 0 && output.exit_code != 1 {
            return Err(ScanError::Process(crate::error::ProcessError::NonZeroExit {
                operation: "diff".to_string(),
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            }));
        }
        if output.stdout.trim().is_empty() {
            return Ok(None);
        }

        let rewritten = rewrite_new_file_diff(path, &output.stdout);
        let mut files = parser::parse_diff(&rewritten)?;
        Ok(files.pop())
    }
}

/// Rewrite `git diff --no-index /dev/null <path>` output into the header
/// shape of a regular new-file diff.
fn rewrite_new_file_diff(path: &str, raw: &str) -> String {
    let mut out = format!(
        "diff --git a/{path} b/{path}\nnew file mode 100644\nindex 0000000..0000000\n--- /dev/null\n+++ b/{path}"
    );

    let is_binary = raw.lines().any(|l| l.starts_with("Binary files"));
    if is_binary {
        out.push_str("\nBinary files /dev/null and b/");
        out.push_str(path);
        out.push_str(" differ");
        return out;
    }

    for line in raw.lines().skip_while(|l| !l.starts_with("@@")) {
        out.push('\n');
        out.push_str(line);
    }
    out
}
