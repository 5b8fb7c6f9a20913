//! Unified diff generation
//!
//! Line-level Myers diff (via `similar`) grouped into hunks with surrounding
//! context, rendered in the classic unified format.

use crate::hunk::{Hunk, HunkLine, UnifiedDiff};
use breba_document::Document;
use similar::{Algorithm, DiffOp, DiffTag};

/// Lines of context around each change
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Label of the old side in generated headers
pub const OLD_LABEL: &str = "before";
/// Label of the new side in generated headers
pub const NEW_LABEL: &str = "after";

/// Unified diff text turning `old` into `new`
///
/// Deterministic and pure. Identical documents give the empty string.
#[must_use]
pub fn diff(old: &Document, new: &Document) -> String {
    diff_with_context(old, new, DEFAULT_CONTEXT_LINES)
}

/// Like [`diff`] with an explicit context radius
#[must_use]
pub fn diff_with_context(old: &Document, new: &Document, context: usize) -> String {
    compute(old, new, context).to_string()
}

/// Structured diff turning `old` into `new`
#[must_use]
pub fn compute(old: &Document, new: &Document, context: usize) -> UnifiedDiff {
    let (a, b) = (old.lines(), new.lines());
    let ops = similar::capture_diff_slices(Algorithm::Myers, a, b);

    let hunks = similar::group_diff_ops(ops, context)
        .into_iter()
        .filter(|group| group.iter().any(|op| op.tag() != DiffTag::Equal))
        .filter_map(|group| build_hunk(&group, a, b))
        .collect();

    UnifiedDiff {
        old_label: OLD_LABEL.to_string(),
        new_label: NEW_LABEL.to_string(),
        hunks,
    }
}

fn build_hunk(group: &[DiffOp], a: &[String], b: &[String]) -> Option<Hunk> {
    let (first, last) = (group.first()?, group.last()?);
    let old_range = first.old_range().start..last.old_range().end;
    let new_range = first.new_range().start..last.new_range().end;

    let mut lines = Vec::new();
    for op in group {
        let (tag, old, new) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => lines.extend(a[old].iter().cloned().map(HunkLine::Context)),
            DiffTag::Delete => lines.extend(a[old].iter().cloned().map(HunkLine::Removed)),
            DiffTag::Insert => lines.extend(b[new].iter().cloned().map(HunkLine::Added)),
            DiffTag::Replace => {
                lines.extend(a[old].iter().cloned().map(HunkLine::Removed));
                lines.extend(b[new].iter().cloned().map(HunkLine::Added));
            }
        }
    }

    Some(Hunk {
        source_start: declared_start(old_range.start, old_range.len()),
        source_len: old_range.len(),
        target_start: declared_start(new_range.start, new_range.len()),
        target_len: new_range.len(),
        lines,
    })
}

/// 1-based start, or the preceding line number for an empty range
fn declared_start(start: usize, len: usize) -> usize {
    if len == 0 {
        start
    } else {
        start + 1
    }
}
