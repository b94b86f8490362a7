//! qit - An interactive git commit front-end.
//!
//! # Overview
//!
//! qit scans the working tree for pending changes, classifies each changed
//! file into a conventional commit type, lets the user pick files and hunks
//! interactively, composes a conventional commit message, and executes the
//! commit transactionally with automatic rollback on failure.

pub mod classify;
pub mod commit;
pub mod compose;
pub mod config;
pub mod error;
pub mod process;
pub mod scan;
pub mod select;

// Re-export commonly used types
pub use classify::{Classification, CommitType};
pub use commit::{CommitPlan, CommitResult};
pub use compose::CommitMessage;
pub use config::Config;
pub use error::{CommitError, ComposeError, ProcessError, ScanError, SelectError};
pub use process::{CancelToken, CommandOutput, GitProcess, ProcessGateway};
pub use scan::{ChangeEntry, ChangeKind, ChangeSet, Hunk, Scanner};
