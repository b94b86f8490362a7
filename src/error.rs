//! Error types for qit modules using thiserror.

use thiserror::Error;

/// Errors from external process execution through the gateway.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("git not found on PATH. Install git and make sure it is on your PATH")]
    GitNotInstalled,

    #[error("Failed to spawn git process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("git {operation} exited with code {code}: {stderr}")]
    NonZeroExit {
        operation: String,
        code: i32,
        stderr: String,
    },

    #[error("git {operation} timed out after {} seconds", timeout.as_secs())]
    Timeout {
        operation: String,
        timeout: std::time::Duration,
    },

    #[error("Operation cancelled before git {operation} finished")]
    Cancelled { operation: String },

    #[error("git {operation} produced non-UTF-8 output")]
    InvalidOutput { operation: String },
}

/// Errors from scanning the working tree.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Not a git repository. Run qit from within a git working tree")]
    NotARepository,

    #[error("Unrecognized status record: '{record}'")]
    UnrecognizedRecord { record: String },

    #[error("Malformed hunk header: '{header}'")]
    MalformedHunkHeader { header: String },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Errors from the interactive selector.
#[derive(Error, Debug)]
pub enum SelectError {
    #[error("Interactive prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Errors from commit message composition.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Commit summary is empty. A one-line summary is required")]
    EmptySummary,

    #[error("Commit summary too long: {len} chars (max {max})")]
    SummaryTooLong { len: usize, max: usize },

    #[error("Commit summary must be a single line")]
    MultilineSummary,
}

/// Errors from the commit orchestrator.
///
/// Failures in the snapshot/stage/verify/commit steps trigger an automatic
/// rollback before surfacing; `AmbiguousOutcome` deliberately does not.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Commit plan has no selected changes")]
    EmptyPlan,

    #[error("Failed to snapshot index state: {0}")]
    SnapshotFailed(#[source] ProcessError),

    #[error("Failed to stage '{path}': {source}")]
    StagingFailed {
        path: String,
        #[source]
        source: ProcessError,
    },

    #[error(
        "Staged state diverged from the plan (expected {expected:?}, found {found:?}). \
         The index has been restored; re-run qit to pick up the current working tree"
    )]
    StagingDiverged {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("git commit failed: {stderr}")]
    CommitFailed { stderr: String },

    #[error(
        "Rollback failed after '{during}': {source}. \
         Manual cleanup may be needed: git reset && git status"
    )]
    RollbackFailed {
        during: String,
        #[source]
        source: ProcessError,
    },

    #[error(
        "Commit outcome is unknown: the commit step ran but the result could not be read \
         ({detail}). Verify manually with 'git status' and 'git log -1' before retrying"
    )]
    AmbiguousOutcome { detail: String },

    #[error("Failed to write temporary {purpose} file: {source}")]
    TempFile {
        purpose: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),
}
