//! Parsers for `git status --porcelain` records and unified diff output.
//!
//! Both parsers fail closed: a record or hunk header that doesn't match the
//! documented stable format is an error, never a guess.

use regex_lite::Regex;

use crate::error::ScanError;
use crate::scan::changeset::{ChangeKind, Hunk};

/// One parsed `git status --porcelain` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub kind: ChangeKind,
    pub path: String,
    /// Original path for rename/copy records.
    pub old_path: Option<String>,
}

/// One file's worth of unified diff output.
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub path: String,
    pub old_path: Option<String>,
    /// Header block: `diff --git` through the line before the first `@@`.
    pub header: String,
    pub is_binary: bool,
    pub hunks: Vec<Hunk>,
}

/// Parse the output of `git status --porcelain`.
pub fn parse_status(output: &str) -> Result<Vec<StatusRecord>, ScanError> {
    let mut records = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }
        records.push(parse_status_line(line)?);
    }

    Ok(records)
}

/// Parse a single porcelain record: two status columns, a space, the path.
fn parse_status_line(line: &str) -> Result<StatusRecord, ScanError> {
    let unrecognized = || ScanError::UnrecognizedRecord {
        record: line.to_string(),
    };

    let mut chars = line.chars();
    let x = chars.next().ok_or_else(unrecognized)?;
    let y = chars.next().ok_or_else(unrecognized)?;
    if chars.next() != Some(' ') {
        return Err(unrecognized());
    }

    let rest = &line[3..];
    if rest.is_empty() {
        return Err(unrecognized());
    }

    let kind = kind_from_columns(x, y).ok_or_else(unrecognized)?;

    let (path, old_path) = if kind.has_old_path() {
        let (old, new) = rest.split_once(" -> ").ok_or_else(unrecognized)?;
        (unquote(new), Some(unquote(old)))
    } else {
        (unquote(rest), None)
    };

    Ok(StatusRecord {
        kind,
        path,
        old_path,
    })
}

/// Map the XY status columns to a change kind.
///
/// Unmerged states (any `U`, `AA`, `DD`) are not supported by this tool
/// and return None so the caller fails closed.
fn kind_from_columns(x: char, y: char) -> Option<ChangeKind> {
    if x == '?' && y == '?' {
        return Some(ChangeKind::Added);
    }
    if x == 'U' || y == 'U' || (x == 'A' && y == 'A') || (x == 'D' && y == 'D') {
        return None;
    }

    for c in [x, y] {
        match c {
            'R' => return Some(ChangeKind::Renamed),
            'C' => return Some(ChangeKind::Copied),
            _ => {}
        }
    }
    for c in [x, y] {
        match c {
            'A' => return Some(ChangeKind::Added),
            'D' => return Some(ChangeKind::Deleted),
            'M' | 'T' => return Some(ChangeKind::Modified),
            _ => {}
        }
    }
    None
}

/// Strip the surrounding quotes git adds around paths with special
/// characters. Escape sequences inside are left as-is.
fn unquote(path: &str) -> String {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
        .to_string()
}

/// Parse unified diff output into per-file diffs with hunks.
pub fn parse_diff(diff: &str) -> Result<Vec<FileDiff>, ScanError> {
    let hunk_re = hunk_header_regex();
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut old_side: Option<String> = None;

    for line in diff.lines() {
        if line.starts_with("diff --git") {
            if let Some(file) = current.take() {
                files.push(file);
            }
            old_side = None;
            current = Some(FileDiff {
                path: path_from_diff_header(line),
                old_path: None,
                header: line.to_string(),
                is_binary: false,
                hunks: Vec::new(),
            });
            continue;
        }

        let Some(file) = current.as_mut() else {
            // Preamble before the first file header (e.g. nothing to parse).
            continue;
        };

        if line.starts_with("@@") {
            file.hunks.push(parse_hunk_header(&hunk_re, line)?);
        } else if let Some(hunk) = file.hunks.last_mut() {
            if !hunk.body.is_empty() {
                hunk.body.push('\n');
            }
            hunk.body.push_str(line);
        } else {
            // Still in the file header block.
            if line.starts_with("Binary files") || line.starts_with("GIT binary patch") {
                file.is_binary = true;
            } else if let Some(old) = line.strip_prefix("rename from ") {
                file.old_path = Some(old.to_string());
            } else if let Some(new) = line.strip_prefix("rename to ") {
                file.path = new.to_string();
            } else if let Some(old) = line.strip_prefix("copy from ") {
                file.old_path = Some(old.to_string());
            } else if let Some(new) = line.strip_prefix("copy to ") {
                file.path = new.to_string();
            } else if let Some(rest) = line.strip_prefix("--- ") {
                old_side = strip_diff_path(rest, "a/");
            } else if let Some(rest) = line.strip_prefix("+++ ") {
                // The +++ line names the new path unambiguously even when
                // it contains spaces; deletions only have the old side.
                if let Some(new) = strip_diff_path(rest, "b/") {
                    file.path = new;
                } else if rest.trim_end() == "/dev/null" {
                    if let Some(ref old) = old_side {
                        file.path = old.clone();
                    }
                }
            }
            file.header.push('\n');
            file.header.push_str(line);
        }
    }

    if let Some(file) = current {
        files.push(file);
    }

    Ok(files)
}

/// Extract the new-side path from a `diff --git a/X b/Y` line.
///
/// Paths containing spaces make the line ambiguous, but both sides are
/// identical except for renames and copies, which carry their own header
/// lines; the symmetric `X b/X` split resolves the common case and the
/// `---`/`+++` lines override the rest.
fn path_from_diff_header(line: &str) -> String {
    if let Some(rest) = line.strip_prefix("diff --git a/") {
        for (i, _) in rest.match_indices(" b/") {
            if rest[..i] == rest[i + 3..] {
                return rest[..i].to_string();
            }
        }
    }
    line.split_whitespace()
        .nth(3)
        .map_or("unknown", |s| s.strip_prefix("b/").unwrap_or(s))
        .to_string()
}

/// Extract the path from a `---`/`+++` header value: drop quotes, the
/// `a/`/`b/` prefix, and the trailing tab git appends for unusual names.
fn strip_diff_path(value: &str, prefix: &str) -> Option<String> {
    let value = value.trim_end_matches('\t');
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    value.strip_prefix(prefix).map(str::to_string)
}

fn hunk_header_regex() -> Regex {
    // @@ -old_start[,old_lines] +new_start[,new_lines] @@ [context]
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk header regex")
}

fn parse_hunk_header(re: &Regex, line: &str) -> Result<Hunk, ScanError> {
    let caps = re.captures(line).ok_or_else(|| ScanError::MalformedHunkHeader {
        header: line.to_string(),
    })?;

    let num = |i: usize, default: u32| -> Result<u32, ScanError> {
        match caps.get(i) {
            Some(m) => m
                .as_str()
                .parse::<u32>()
                .map_err(|_| ScanError::MalformedHunkHeader {
                    header: line.to_string(),
                }),
            None => Ok(default),
        }
    };

    Ok(Hunk {
        old_start: num(1, 0)?,
        old_lines: num(2, 1)?,
        new_start: num(3, 0)?,
        new_lines: num(4, 1)?,
        header: line.to_string(),
        body: String::new(),
        selected: false,
    })
}
