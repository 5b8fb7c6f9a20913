//! Breba Core - edit reconciliation
//!
//! Mediates between free-form model output and a stable HTML page:
//! - Applies small model-proposed edits as strict unified diffs
//! - Falls back to streamed full regeneration when a diff cannot be trusted
//! - Streams complete tag groups to a live preview
//! - Stores one page per collaboration session, with serialized edits
//! - Hands applied edits to the builder agent for specification revision
//!
//! # Example
//!
//! ```rust,ignore
//! use breba_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(service: Arc<dyn GenerationService>) -> Result<(), ReconcileError> {
//! let reconciler = EditReconciler::new(service, ReconcileConfig::new());
//! let store = SessionStore::new();
//! let session = store.create();
//!
//! session.generate(&reconciler, "A landing page for a bakery").await?;
//! let outcome = session.edit(&reconciler, "Make the heading green").await?;
//! println!("via diff: {}\n{}", outcome.applied_via_diff, outcome.diff);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod generation;
pub mod revision;
pub mod session;
pub mod workflow;

pub use config::ReconcileConfig;
pub use error::{GenerationError, ReconcileError};
pub use generation::{GenerationChunk, GenerationService, GenerationStream, TextStream};
pub use revision::{
    revise_specification, revision_message, AgentReply, SpecRevision, SpecificationAgent,
    REVISION_DIRECTIVE,
};
pub use session::{EditSession, SessionId, SessionStore};
pub use workflow::{EditReconciler, ReconcileOutcome, RenderEvent};

pub use breba_document::{ContentHash, Document};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Breba Core
    pub use crate::{
        Document, EditReconciler, EditSession, GenerationChunk, GenerationService,
        ReconcileConfig, ReconcileError, ReconcileOutcome, RenderEvent, SessionId, SessionStore,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
