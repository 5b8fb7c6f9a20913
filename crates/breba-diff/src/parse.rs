//! Unified diff validation and parsing
//!
//! Grammar accepted:
//!
//! ```text
//! <preamble lines, ignored>
//! --- <label>
//! +++ <label>
//! @@ -<start>[,<len>] +<start>[,<len>] @@ [section heading]
//! ( ' ' context | '-' removed | '+' added | '\' marker | blank )*
//! ... more hunks ...
//! ```
//!
//! A blank line inside a hunk body is read as a context line for an empty
//! base line, which is how most tools and models emit it after trimming
//! trailing whitespace. Blank lines at the very end of the text are ignored.

use crate::error::PatchApplyError;
use crate::hunk::{Hunk, HunkLine, UnifiedDiff};

const OLD_HEADER: &str = "--- ";
const NEW_HEADER: &str = "+++ ";
const HUNK_HEADER: &str = "@@";

/// Check that `diff_text` follows the unified diff grammar
///
/// Pure: never mutates anything and yields the same result on every call.
/// Only structure is checked; whether the diff fits a base document is
/// decided by [`crate::apply`].
///
/// # Errors
/// `MalformedDiff` naming the missing header, the empty hunk, or the first
/// invalid hunk line.
pub fn validate(diff_text: &str) -> Result<(), PatchApplyError> {
    let lines: Vec<&str> = diff_text.lines().collect();
    if lines.iter().all(|l| l.trim().is_empty()) {
        return Err(PatchApplyError::malformed("empty diff"));
    }

    let first_hunk = lines.iter().position(|l| l.starts_with(HUNK_HEADER));
    let preamble = &lines[..first_hunk.unwrap_or(lines.len())];

    let old_headers: Vec<usize> = header_positions(preamble, OLD_HEADER);
    let new_headers: Vec<usize> = header_positions(preamble, NEW_HEADER);

    if old_headers.is_empty() {
        return Err(PatchApplyError::malformed("missing '--- ' header line"));
    }
    if new_headers.is_empty() {
        return Err(PatchApplyError::malformed("missing '+++ ' header line"));
    }
    let Some(first_hunk) = first_hunk else {
        return Err(PatchApplyError::malformed("missing '@@ ... @@' hunk header"));
    };
    if old_headers.len() > 1 || new_headers.len() > 1 {
        return Err(PatchApplyError::malformed(
            "more than one file header; multi-file patches are not supported",
        ));
    }
    if new_headers[0] < old_headers[0] {
        return Err(PatchApplyError::malformed(
            "'+++ ' header appears before '--- ' header",
        ));
    }

    let mut hunk_no = 0usize;
    let mut has_content = false;
    for line in &lines[first_hunk..] {
        if line.starts_with(HUNK_HEADER) {
            if hunk_no > 0 && !has_content {
                return Err(PatchApplyError::malformed(format!("hunk {hunk_no} is empty")));
            }
            hunk_no += 1;
            has_content = false;
            continue;
        }

        match line.chars().next() {
            Some(' ' | '-' | '+') => has_content = true,
            Some('\\') => {}
            _ if line.trim().is_empty() => {}
            _ => {
                return Err(PatchApplyError::malformed(format!(
                    "invalid line in hunk {hunk_no}: {line:?}"
                )));
            }
        }
    }
    if !has_content {
        return Err(PatchApplyError::malformed(format!("hunk {hunk_no} is empty")));
    }

    Ok(())
}

fn header_positions(preamble: &[&str], prefix: &str) -> Vec<usize> {
    preamble
        .iter()
        .enumerate()
        .filter(|(_, l)| l.starts_with(prefix))
        .map(|(i, _)| i)
        .collect()
}

/// Validate and parse `diff_text` into a [`UnifiedDiff`]
///
/// # Errors
/// `MalformedDiff` if [`validate`] fails or a hunk header has no parsable
/// ranges.
pub fn parse(diff_text: &str) -> Result<UnifiedDiff, PatchApplyError> {
    validate(diff_text)?;

    let mut lines: Vec<&str> = diff_text.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    let mut old_label = String::new();
    let mut new_label = String::new();
    let mut hunks: Vec<Hunk> = Vec::new();

    for line in lines {
        if line.starts_with(HUNK_HEADER) {
            hunks.push(parse_hunk_header(line, hunks.len() + 1)?);
            continue;
        }

        let Some(hunk) = hunks.last_mut() else {
            if let Some(label) = line.strip_prefix(OLD_HEADER) {
                old_label = label.trim_end().to_string();
            } else if let Some(label) = line.strip_prefix(NEW_HEADER) {
                new_label = label.trim_end().to_string();
            }
            continue;
        };

        let body = line.get(1..).unwrap_or_default().to_string();
        match line.chars().next() {
            Some(' ') => hunk.lines.push(HunkLine::Context(body)),
            Some('-') => hunk.lines.push(HunkLine::Removed(body)),
            Some('+') => hunk.lines.push(HunkLine::Added(body)),
            Some('\\') => {}
            // blank (possibly whitespace-only) line: an empty context line
            _ => hunk.lines.push(HunkLine::Context(String::new())),
        }
    }

    tracing::debug!(hunks = hunks.len(), "parsed unified diff");

    Ok(UnifiedDiff {
        old_label,
        new_label,
        hunks,
    })
}

/// Parse `@@ -s[,l] +s[,l] @@ ...`
fn parse_hunk_header(line: &str, hunk_no: usize) -> Result<Hunk, PatchApplyError> {
    let invalid = || PatchApplyError::malformed(format!("invalid header for hunk {hunk_no}: {line:?}"));

    let rest = &line[HUNK_HEADER.len()..];
    let ranges = rest.split(HUNK_HEADER).next().unwrap_or(rest);

    let mut source = None;
    let mut target = None;
    for token in ranges.split_whitespace() {
        if let Some(range) = token.strip_prefix('-') {
            source = Some(parse_range(range).ok_or_else(invalid)?);
        } else if let Some(range) = token.strip_prefix('+') {
            target = Some(parse_range(range).ok_or_else(invalid)?);
        } else {
            return Err(invalid());
        }
    }

    let ((source_start, source_len), (target_start, target_len)) =
        source.zip(target).ok_or_else(invalid)?;

    Ok(Hunk {
        source_start,
        source_len,
        target_start,
        target_len,
        lines: Vec::new(),
    })
}

/// `start[,len]`, `len` defaulting to 1
fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}
