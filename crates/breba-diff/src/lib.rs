//! Breba Diff Engine
//!
//! Unified diffs between [`Document`] versions, and a strict patch applier
//! for diffs proposed by the generator model.
//!
//! # Core Operations
//!
//! - [`diff`]: unified diff text between two documents
//! - [`validate`]: grammar check of diff text, no base needed
//! - [`parse`]: diff text into a structured [`UnifiedDiff`]
//! - [`apply`]: validate, parse and apply against a base document
//!
//! # Placement policy
//!
//! Hunks are positioned by the start line declared in their header, never by
//! searching for a matching block. Every context and removed line is then
//! compared against the base before it is consumed, so a stale base fails
//! with the exact line that drifted.
//!
//! # Example
//!
//! ```rust
//! use breba_diff::{apply, diff};
//! use breba_document::Document;
//!
//! let old = Document::from_text("<p>\nHello\n</p>");
//! let new = Document::from_text("<p>\nHello, world\n</p>");
//!
//! let patch = diff(&old, &new);
//! assert_eq!(apply(&old, &patch).unwrap(), new);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod generate;
mod hunk;
mod parse;

pub use error::PatchApplyError;
pub use generate::{
    compute, diff, diff_with_context, DEFAULT_CONTEXT_LINES, NEW_LABEL, OLD_LABEL,
};
pub use hunk::{Hunk, HunkLine, UnifiedDiff};
pub use parse::{parse, validate};

use breba_document::Document;

/// Apply unified diff text to `base`
///
/// All or nothing: on error no document is produced.
///
/// # Errors
/// - `MalformedDiff` if the text fails [`validate`] or has unparsable hunk
///   headers
/// - `OverlappingHunks` if hunks overlap or go backwards
/// - `HunkOutOfRange` if a hunk starts past the end of `base`
/// - `ContextMismatch` / `RemovalMismatch` if `base` differs from the
///   document the diff was computed against
pub fn apply(base: &Document, diff_text: &str) -> Result<Document, PatchApplyError> {
    let parsed = parse(diff_text)?;
    let patched = parsed.apply_to(base)?;
    tracing::debug!(
        hunks = parsed.hunks.len(),
        base = %base.hash().short(),
        result = %patched.hash().short(),
        "diff applied"
    );
    Ok(patched)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
