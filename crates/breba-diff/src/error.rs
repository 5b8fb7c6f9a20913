//! Error types for diff validation and patch application
//!
//! Every failure of [`crate::apply`] is one [`PatchApplyError`]. Variants
//! fall into two groups:
//! - structural: the diff text does not follow the unified grammar
//! - drift: the diff is well formed but was computed against a different
//!   base than the one it is being applied to

/// Errors during diff validation and application
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchApplyError {
    /// Diff text violates the unified diff grammar
    #[error("malformed diff: {reason}")]
    MalformedDiff { reason: String },

    /// A hunk starts before the end of the previous one
    #[error(
        "overlapping hunks: hunk {hunk} starts at line {start} but lines through {consumed_through} were already consumed"
    )]
    OverlappingHunks {
        /// 1-based hunk number
        hunk: usize,
        /// 1-based first base line of the hunk
        start: usize,
        /// Last base line consumed by earlier hunks
        consumed_through: usize,
    },

    /// A hunk starts past the end of the base document
    #[error("hunk {hunk} starts at line {start} but the document has {len} lines")]
    HunkOutOfRange {
        /// 1-based hunk number
        hunk: usize,
        /// 1-based first base line of the hunk
        start: usize,
        /// Base document length
        len: usize,
    },

    /// A context line does not match the base document
    #[error("context mismatch at line {line}: expected {expected:?}, found {}", describe(.actual))]
    ContextMismatch {
        /// 1-based base line
        line: usize,
        expected: String,
        /// `None` past the end of the document
        actual: Option<String>,
    },

    /// A removed line does not match the base document
    #[error("removal mismatch at line {line}: expected {expected:?}, found {}", describe(.actual))]
    RemovalMismatch {
        /// 1-based base line
        line: usize,
        expected: String,
        /// `None` past the end of the document
        actual: Option<String>,
    },
}

fn describe(actual: &Option<String>) -> String {
    match actual {
        Some(line) => format!("{line:?}"),
        None => "end of document".to_string(),
    }
}

impl PatchApplyError {
    /// Create malformed diff error
    #[inline]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDiff {
            reason: reason.into(),
        }
    }

    /// True for grammar violations
    #[inline]
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedDiff { .. })
    }

    /// True when the base document no longer matches what the diff expects
    #[inline]
    #[must_use]
    pub fn is_drift(&self) -> bool {
        matches!(
            self,
            Self::ContextMismatch { .. } | Self::RemovalMismatch { .. } | Self::HunkOutOfRange { .. }
        )
    }

    /// 1-based base line the error refers to, if any
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::ContextMismatch { line, .. } | Self::RemovalMismatch { line, .. } => Some(*line),
            Self::OverlappingHunks { start, .. } | Self::HunkOutOfRange { start, .. } => {
                Some(*start)
            }
            Self::MalformedDiff { .. } => None,
        }
    }
}
