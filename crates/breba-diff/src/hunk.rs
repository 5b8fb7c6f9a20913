//! Structured unified diffs
//!
//! [`UnifiedDiff`] is the parsed form of a diff: two header labels and an
//! ordered list of [`Hunk`]s. It renders back to unified text through
//! `Display` and applies itself to a [`Document`] with a single forward
//! cursor.

use crate::error::PatchApplyError;
use breba_document::Document;
use std::fmt::{self, Display, Formatter};

/// One line of a hunk body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    /// Unchanged line, must match the base
    Context(String),
    /// Line dropped from the base, must match the base
    Removed(String),
    /// Line inserted into the output
    Added(String),
}

impl HunkLine {
    /// Line text without the prefix
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Context(t) | Self::Removed(t) | Self::Added(t) => t,
        }
    }

    /// Unified diff prefix character
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> char {
        match self {
            Self::Context(_) => ' ',
            Self::Removed(_) => '-',
            Self::Added(_) => '+',
        }
    }

    /// True if the line consumes a base line
    #[inline]
    #[must_use]
    pub fn consumes_base(&self) -> bool {
        !matches!(self, Self::Added(_))
    }
}

/// Contiguous, positioned block of a unified diff
///
/// Ranges are stored exactly as declared in the `@@ -s,l +s,l @@` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub source_start: usize,
    pub source_len: usize,
    pub target_start: usize,
    pub target_len: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// 0-based index of the first base line the hunk touches
    ///
    /// An empty source range names the line *after which* to insert, so it
    /// is already the 0-based insertion point.
    #[inline]
    #[must_use]
    pub fn base_index(&self) -> usize {
        if self.source_len == 0 {
            self.source_start
        } else {
            self.source_start.saturating_sub(1)
        }
    }

    /// Counts of (context, removed, added) lines
    #[must_use]
    pub fn line_counts(&self) -> (usize, usize, usize) {
        self.lines.iter().fold((0, 0, 0), |(c, r, a), line| match line {
            HunkLine::Context(_) => (c + 1, r, a),
            HunkLine::Removed(_) => (c, r + 1, a),
            HunkLine::Added(_) => (c, r, a + 1),
        })
    }
}

/// Unified range notation: a length of 1 is implied.
fn format_range(start: usize, len: usize) -> String {
    if len == 1 {
        start.to_string()
    } else {
        format!("{start},{len}")
    }
}

impl Display for Hunk {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            format_range(self.source_start, self.source_len),
            format_range(self.target_start, self.target_len)
        )?;
        for line in &self.lines {
            writeln!(f, "{}{}", line.prefix(), line.text())?;
        }
        Ok(())
    }
}

/// Parsed unified diff for a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedDiff {
    pub old_label: String,
    pub new_label: String,
    pub hunks: Vec<Hunk>,
}

impl UnifiedDiff {
    /// True when there are no hunks
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Total (added, removed) line counts
    #[must_use]
    pub fn stats(&self) -> (usize, usize) {
        self.hunks.iter().fold((0, 0), |(a, r), hunk| {
            let (_, removed, added) = hunk.line_counts();
            (a + added, r + removed)
        })
    }

    /// Apply to `base`, producing a new document
    ///
    /// Hunks are placed by their declared start; every context and removed
    /// line is checked against the base before it is consumed.
    ///
    /// # Errors
    /// - `OverlappingHunks` if a hunk starts before the cursor
    /// - `HunkOutOfRange` if a hunk starts past the end of `base`
    /// - `ContextMismatch` / `RemovalMismatch` on any content drift
    pub fn apply_to(&self, base: &Document) -> Result<Document, PatchApplyError> {
        let src = base.lines();
        let mut out: Vec<String> = Vec::with_capacity(src.len());
        let mut cursor = 0usize;

        for (i, hunk) in self.hunks.iter().enumerate() {
            let start = hunk.base_index();

            if cursor > start {
                return Err(PatchApplyError::OverlappingHunks {
                    hunk: i + 1,
                    start: start.saturating_add(1),
                    consumed_through: cursor,
                });
            }
            if start > src.len() {
                return Err(PatchApplyError::HunkOutOfRange {
                    hunk: i + 1,
                    start: start.saturating_add(1),
                    len: src.len(),
                });
            }

            out.extend_from_slice(&src[cursor..start]);
            cursor = start;

            for line in &hunk.lines {
                match line {
                    HunkLine::Context(text) => {
                        if src.get(cursor) != Some(text) {
                            return Err(PatchApplyError::ContextMismatch {
                                line: cursor + 1,
                                expected: text.clone(),
                                actual: src.get(cursor).cloned(),
                            });
                        }
                        out.push(text.clone());
                        cursor += 1;
                    }
                    HunkLine::Removed(text) => {
                        if src.get(cursor) != Some(text) {
                            return Err(PatchApplyError::RemovalMismatch {
                                line: cursor + 1,
                                expected: text.clone(),
                                actual: src.get(cursor).cloned(),
                            });
                        }
                        cursor += 1;
                    }
                    HunkLine::Added(text) => out.push(text.clone()),
                }
            }

            tracing::trace!(hunk = i + 1, start = start + 1, cursor, "hunk applied");
        }

        out.extend_from_slice(&src[cursor..]);
        Ok(Document::from_lines(out))
    }
}

impl Display for UnifiedDiff {
    /// Renders unified text; an empty diff renders as the empty string.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.hunks.is_empty() {
            return Ok(());
        }
        writeln!(f, "--- {}", self.old_label)?;
        writeln!(f, "+++ {}", self.new_label)?;
        for hunk in &self.hunks {
            write!(f, "{hunk}")?;
        }
        Ok(())
    }
}
