//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use qit::error::ProcessError;
use qit::process::{CommandOutput, ProcessGateway};

/// A test git repository builder for integration tests.
///
/// Built with git2 for convenience; the code under test talks to the same
/// repository through the real git binary.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");

        // A local identity so `git commit` works without global config.
        let mut config = repo.config().expect("Failed to open repo config");
        config
            .set_str("user.name", "Test User")
            .expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");

        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write a file relative to the repository root.
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&path, content).expect("Failed to write test file");
    }

    /// Read a file relative to the repository root.
    pub fn read_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative)).expect("Failed to read test file")
    }

    /// Stage a path into the index.
    pub fn stage(&self, relative: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index
            .add_path(Path::new(relative))
            .expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Commit everything currently staged. Returns the commit OID.
    pub fn commit_staged(&self, message: &str) -> Oid {
        let sig = self.signature();
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Write, stage, and commit a file in one step.
    pub fn commit_file(&self, relative: &str, content: &str, message: &str) -> Oid {
        self.write_file(relative, content);
        self.stage(relative);
        self.commit_staged(message)
    }

    /// Message of the commit at HEAD.
    pub fn head_message(&self) -> String {
        self.repo
            .head()
            .expect("Failed to read HEAD")
            .peel_to_commit()
            .expect("HEAD is not a commit")
            .message()
            .expect("Commit message is not UTF-8")
            .to_string()
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> usize {
        let mut walk = self.repo.revwalk().expect("Failed to create revwalk");
        walk.push_head().expect("Failed to push HEAD");
        walk.count()
    }
}

/// Subcommands that mutate repository state, for cancellation assertions.
const MUTATING: &[&str] = &["add", "apply", "commit", "reset", "push"];

/// A scripted response: an invocation whose arguments start with `prefix`
/// yields `response`.
struct Rule {
    prefix: Vec<String>,
    response: Response,
    used: bool,
}

enum Response {
    Output(CommandOutput),
    Failure(fn() -> ProcessError),
}

impl Response {
    fn produce(&self) -> Result<CommandOutput, ProcessError> {
        match self {
            Self::Output(output) => Ok(output.clone()),
            Self::Failure(make) => Err(make()),
        }
    }
}

/// A deterministic [`ProcessGateway`] fake.
///
/// Invocations are matched against scripted rules in registration order.
/// Each rule fires once, so registering the same prefix twice yields
/// sequential responses; once every matching rule has fired, the last one
/// keeps answering. Unmatched invocations succeed with empty output. Every
/// call is recorded so tests can assert on the exact command sequence.
pub struct ScriptedGateway {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script a response for invocations starting with `prefix`.
    pub fn on(self, prefix: &[&str], exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            response: Response::Output(CommandOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }),
            used: false,
        });
        self
    }

    /// Script a transport-level failure for invocations starting with
    /// `prefix` (the command never produced an exit code).
    pub fn on_failure(self, prefix: &[&str], error: fn() -> ProcessError) -> Self {
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            response: Response::Failure(error),
            used: false,
        });
        self
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded invocations whose subcommand mutates repository state.
    pub fn mutating_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|args| {
                args.first()
                    .is_some_and(|sub| MUTATING.contains(&sub.as_str()))
            })
            .collect()
    }

    fn respond(&self, args: &[&str]) -> Result<CommandOutput, ProcessError> {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|s| s.to_string()).collect());

        let matches = |rule: &Rule| {
            rule.prefix.len() <= args.len()
                && rule.prefix.iter().zip(args).all(|(want, got)| want == got)
        };

        let mut rules = self.rules.lock().unwrap();
        if let Some(rule) = rules.iter_mut().find(|r| !r.used && matches(r)) {
            rule.used = true;
            return rule.response.produce();
        }
        if let Some(rule) = rules.iter().rev().find(|r| matches(r)) {
            return rule.response.produce();
        }
        Ok(CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

#[async_trait]
impl ProcessGateway for ScriptedGateway {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, ProcessError> {
        self.respond(args)
    }

    async fn run_interactive(&self, args: &[&str]) -> Result<i32, ProcessError> {
        Ok(self.respond(args)?.exit_code)
    }
}
