//! Process gateway: the only path to the external git binary.
//!
//! Every git invocation goes through [`ProcessGateway`], which captures
//! stdout/stderr/exit code, enforces a bounded timeout, and honors a
//! caller-supplied cancellation token. The trait exists so tests can
//! substitute a deterministic fake for the real subprocess.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::debug;

use crate::error::ProcessError;

/// Captured result of a finished git invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Cooperative cancellation handle shared between the UI and the gateway.
///
/// Cancellation is checked before a process is spawned and raced against
/// its completion; a killed child never outlives the call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            self.inner.notify.notified().await;
        }
    }
}

/// Blocking-from-the-caller's-perspective interface to the git binary.
#[async_trait]
pub trait ProcessGateway: Send + Sync {
    /// Run git with the given arguments and capture its output.
    ///
    /// A non-zero exit is not an error at this level; callers that tolerate
    /// specific exit codes inspect [`CommandOutput::exit_code`] themselves,
    /// everyone else goes through [`run_checked`].
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, ProcessError>;

    /// Run git with stdio inherited from the terminal (pager, editor).
    ///
    /// Returns the exit code.
    async fn run_interactive(&self, args: &[&str]) -> Result<i32, ProcessError>;
}

/// Run git through the gateway, failing on any non-zero exit.
pub async fn run_checked(
    gateway: &dyn ProcessGateway,
    args: &[&str],
) -> Result<CommandOutput, ProcessError> {
    let output = gateway.run(args).await?;
    if !output.success() {
        return Err(ProcessError::NonZeroExit {
            operation: operation_name(args),
            code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// Production gateway backed by the system git binary.
pub struct GitProcess {
    workdir: PathBuf,
    timeout: Duration,
    cancel: CancelToken,
}

impl GitProcess {
    pub fn new(workdir: impl AsRef<Path>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
            timeout,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle over the same repository that ignores the cancel token.
    ///
    /// A transactional sequence must finish or roll back once started;
    /// running it on a detached handle keeps a mid-sequence cancellation
    /// from starving the cleanup commands. Callers honor cancellation
    /// between phases via [`GitProcess::is_cancelled`] instead.
    pub fn detached(&self) -> GitProcess {
        GitProcess::new(&self.workdir, self.timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        // The child must not survive a timeout or a dropped future.
        cmd.kill_on_drop(true);
        cmd
    }

    fn check_cancelled(&self, args: &[&str]) -> Result<(), ProcessError> {
        if self.cancel.is_cancelled() {
            return Err(ProcessError::Cancelled {
                operation: operation_name(args),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessGateway for GitProcess {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, ProcessError> {
        self.check_cancelled(args)?;
        let operation = operation_name(args);
        debug!("git {}", args.join(" "));

        let mut cmd = self.command(args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = tokio::select! {
            () = self.cancel.cancelled() => {
                return Err(ProcessError::Cancelled { operation });
            }
            result = timeout(self.timeout, cmd.output()) => {
                result
                    .map_err(|_| ProcessError::Timeout {
                        operation: operation.clone(),
                        timeout: self.timeout,
                    })?
                    .map_err(ProcessError::SpawnFailed)?
            }
        };

        let stdout = String::from_utf8(output.stdout).map_err(|_| ProcessError::InvalidOutput {
            operation: operation.clone(),
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }

    async fn run_interactive(&self, args: &[&str]) -> Result<i32, ProcessError> {
        self.check_cancelled(args)?;
        let operation = operation_name(args);

        let mut child = self
            .command(args)
            .spawn()
            .map_err(ProcessError::SpawnFailed)?;

        let status = timeout(self.timeout, child.wait())
            .await
            .map_err(|_| ProcessError::Timeout {
                operation: operation.clone(),
                timeout: self.timeout,
            })?
            .map_err(ProcessError::SpawnFailed)?;

        Ok(status.code().unwrap_or(-1))
    }
}

/// Check that git is installed and runnable.
///
/// Uses the `which` crate for cross-platform executable detection.
pub async fn check_git_installed() -> Result<(), ProcessError> {
    if which::which("git").is_err() {
        return Err(ProcessError::GitNotInstalled);
    }

    let version_check = Command::new("git")
        .arg("--version")
        .output()
        .await
        .map_err(ProcessError::SpawnFailed)?;

    if !version_check.status.success() {
        return Err(ProcessError::GitNotInstalled);
    }

    Ok(())
}

/// Human-readable name for an invocation, used in error messages.
fn operation_name(args: &[&str]) -> String {
    args.first().map_or_else(|| "git".to_string(), |a| (*a).to_string())
}
