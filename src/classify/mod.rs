//! Commit-type classification heuristics.
//!
//! Pure functions over a parsed [`ChangeSet`]; no I/O. Each entry gets a
//! per-path commit type and a confidence; aggregation across entries is the
//! composer's job, never done here.
//!
//! Heuristic order, first match wins:
//! 1. documentation path -> docs
//! 2. test path -> test
//! 3. build/config path -> build
//! 4. diff only adds new top-level symbols -> feat
//! 5. modified logic without new symbols -> fix when small, else refactor
//! 6. fallback -> chore

use std::fmt;
use std::str::FromStr;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::scan::{ChangeEntry, ChangeKind, ChangeSet};

/// Conventional commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Refactor,
    Test,
    Chore,
    Style,
    Perf,
    Build,
}

impl CommitType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Docs => "docs",
            Self::Refactor => "refactor",
            Self::Test => "test",
            Self::Chore => "chore",
            Self::Style => "style",
            Self::Perf => "perf",
            Self::Build => "build",
        }
    }

    /// Tie-break priority for aggregation; higher wins.
    pub fn priority(self) -> u8 {
        match self {
            Self::Feat => 9,
            Self::Fix => 8,
            Self::Refactor => 7,
            Self::Perf => 6,
            Self::Docs => 5,
            Self::Test => 4,
            Self::Build => 3,
            Self::Style => 2,
            Self::Chore => 1,
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "feat" => Ok(Self::Feat),
            "fix" => Ok(Self::Fix),
            "docs" => Ok(Self::Docs),
            "refactor" => Ok(Self::Refactor),
            "test" => Ok(Self::Test),
            "chore" => Ok(Self::Chore),
            "style" => Ok(Self::Style),
            "perf" => Ok(Self::Perf),
            "build" => Ok(Self::Build),
            _ => Err(format!("Unknown commit type: {}", s)),
        }
    }
}

/// A per-entry classification result.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Index of the classified entry within the change set.
    pub entry_index: usize,
    pub commit_type: CommitType,
    /// In [0, 1]; lower for ambiguous matches.
    pub confidence: f32,
}

/// A change counts as "small and localized" for the fix heuristic below
/// these bounds.
const FIX_MAX_CHANGED_LINES: usize = 24;
const FIX_MAX_HUNKS: usize = 2;

/// Classify every entry of a change set.
pub fn classify(changes: &ChangeSet) -> Vec<Classification> {
    let symbol_re = added_symbol_regex();
    changes
        .entries
        .iter()
        .enumerate()
        .map(|(entry_index, entry)| {
            let (commit_type, confidence) = classify_entry(entry, &symbol_re);
            Classification {
                entry_index,
                commit_type,
                confidence,
            }
        })
        .collect()
}

fn classify_entry(entry: &ChangeEntry, symbol_re: &Regex) -> (CommitType, f32) {
    let path = entry.path.as_str();

    if is_docs_path(path) {
        // A docs-looking path whose diff introduces code symbols is a
        // mixed change; cap the confidence accordingly.
        let confidence = if adds_symbols(entry, symbol_re) { 0.5 } else { 0.9 };
        return (CommitType::Docs, confidence);
    }
    if is_test_path(path) {
        return (CommitType::Test, 0.85);
    }
    if is_build_path(path) {
        return (CommitType::Build, 0.8);
    }

    let additions_only = !entry.has_deletions() && entry.changed_lines() > 0;
    if additions_only && adds_symbols(entry, symbol_re) {
        return (CommitType::Feat, 0.7);
    }
    if entry.kind == ChangeKind::Added && !entry.hunks.is_empty() {
        // New file without recognizable symbols: still most likely a feature.
        return (CommitType::Feat, 0.55);
    }

    if entry.kind == ChangeKind::Modified && !entry.hunks.is_empty() {
        if entry.changed_lines() <= FIX_MAX_CHANGED_LINES && entry.hunks.len() <= FIX_MAX_HUNKS {
            return (CommitType::Fix, 0.65);
        }
        return (CommitType::Refactor, 0.55);
    }

    (CommitType::Chore, 0.3)
}

/// Whether any added line introduces a top-level symbol (multi-language
/// keyword table: Rust, Go, Python, JS/TS, Java-ish).
fn adds_symbols(entry: &ChangeEntry, re: &Regex) -> bool {
    entry.hunks.iter().any(|hunk| {
        hunk.body
            .lines()
            .filter(|l| l.starts_with('+'))
            .any(|l| re.is_match(l))
    })
}

fn added_symbol_regex() -> Regex {
    Regex::new(
        r"^\+\s*(?:pub(?:\([a-z:]+\))?\s+)?(?:fn|struct|enum|trait|impl|mod|macro_rules!|func|def|class|interface|function|type)\s",
    )
    .expect("valid symbol regex")
}

fn is_docs_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    let file = lower.rsplit('/').next().unwrap_or(&lower);

    lower.starts_with("docs/")
        || lower.starts_with("doc/")
        || lower.contains("/docs/")
        || file.starts_with("readme")
        || file.starts_with("changelog")
        || file.starts_with("contributing")
        || file.starts_with("license")
        || has_extension(&lower, &["md", "mdx", "rst", "adoc"])
}

fn is_test_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    let file = lower.rsplit('/').next().unwrap_or(&lower);

    lower.starts_with("tests/")
        || lower.starts_with("test/")
        || lower.contains("/tests/")
        || lower.contains("/test/")
        || file.starts_with("test_")
        || lower.contains("_test.")
        || lower.contains(".test.")
        || lower.contains(".spec.")
}

fn is_build_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    let file = lower.rsplit('/').next().unwrap_or(&lower);

    const BUILD_FILES: &[&str] = &[
        "cargo.toml",
        "cargo.lock",
        "package.json",
        "package-lock.json",
        "yarn.lock",
        "go.mod",
        "go.sum",
        "pyproject.toml",
        "requirements.txt",
        "makefile",
        "dockerfile",
        "build.rs",
        ".gitlab-ci.yml",
        ".gitignore",
    ];

    BUILD_FILES.contains(&file)
        || lower.starts_with(".github/")
        || lower.starts_with("ci/")
}

fn has_extension(path: &str, exts: &[&str]) -> bool {
    path.rsplit('.')
        .next()
        .is_some_and(|ext| exts.contains(&ext))
}
