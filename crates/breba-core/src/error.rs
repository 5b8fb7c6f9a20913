//! Error types for Breba Core
//!
//! Two layers:
//! - [`GenerationError`]: the text-generation service or its stream failed
//! - [`ReconcileError`]: anything that stops an edit from producing a document

use breba_diff::PatchApplyError;
use breba_document::ContentHash;

/// Failure reported by a generation service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The service rejected or failed the request
    #[error("generation service failed: {0}")]
    Service(String),

    /// The stream broke off mid-response
    #[error("generation stream interrupted: {0}")]
    Interrupted(String),
}

impl GenerationError {
    /// Create service failure
    #[inline]
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    /// Create stream interruption
    #[inline]
    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted(message.into())
    }
}

/// Main reconciliation error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Targeted diff stream grew past the line limit
    #[error("targeted diff exceeded {limit} lines")]
    DiffTooLarge { limit: usize },

    /// Targeted diff was malformed or did not match the document
    #[error("patch rejected: {0}")]
    Patch(#[from] PatchApplyError),

    /// Generation service failed
    #[error("{0}")]
    Generation(#[from] GenerationError),

    /// Regeneration stream ended without a completion chunk
    #[error("regeneration stream ended before completion")]
    IncompleteStream,

    /// Regeneration completed with no content
    #[error("regeneration produced an empty document")]
    EmptyDocument,

    /// Session document changed while the edit was running
    #[error("document changed during edit: expected base {}, found {}", .expected.short(), .actual.short())]
    StaleBase {
        expected: ContentHash,
        actual: ContentHash,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReconcileError {
    /// True for errors that only the targeted-diff path produces
    ///
    /// Classifies an error returned by
    /// [`EditReconciler::reconcile_edit`](crate::EditReconciler::reconcile_edit)
    /// or [`EditReconciler::generate`](crate::EditReconciler::generate).
    /// A `Generation` error is recovered from on the diff path too, so every
    /// [`ReconcileOutcome::fallback_reason`](crate::ReconcileOutcome::fallback_reason)
    /// was recovered from whatever this returns.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DiffTooLarge { .. } | Self::Patch(_))
    }

    /// True for errors that end an edit with nothing committed, when returned
    /// rather than recorded as a fallback reason
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Create configuration error
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
