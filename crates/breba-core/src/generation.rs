//! Generation service seam
//!
//! The language model is an opaque, injected collaborator. It answers an edit
//! instruction either with a unified diff (streamed as raw text) or with a full
//! regenerated page (streamed as [`GenerationChunk`]s ending in a completion
//! chunk).

use crate::error::GenerationError;
use async_trait::async_trait;
use breba_document::Document;
use futures::stream::BoxStream;

/// Raw text chunks of a targeted diff
pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

/// Chunks of a streamed page
pub type GenerationStream = BoxStream<'static, Result<GenerationChunk, GenerationError>>;

/// One chunk of a streamed page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationChunk {
    /// Text delivered with this chunk
    ///
    /// On the completion chunk this is the generator's final page, or empty
    /// when it only signals the end of the stream.
    pub content: String,
    /// Marks the last chunk
    pub is_complete: bool,
}

impl GenerationChunk {
    /// Intermediate chunk
    #[inline]
    pub fn partial(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_complete: false,
        }
    }

    /// Completion chunk carrying the final page
    #[inline]
    pub fn complete(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_complete: true,
        }
    }

    /// Completion chunk without content
    #[inline]
    #[must_use]
    pub fn done() -> Self {
        Self::complete(String::new())
    }
}

/// Asynchronous text generation
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Ask for a unified diff that applies `instruction` to `current`
    async fn request_targeted_diff(
        &self,
        current: &Document,
        instruction: &str,
    ) -> Result<TextStream, GenerationError>;

    /// Ask for the whole page regenerated with `instruction` applied
    async fn request_full_regeneration(
        &self,
        current: &Document,
        instruction: &str,
    ) -> Result<GenerationStream, GenerationError>;

    /// Ask for a first render of a site specification
    ///
    /// Defaults to a regeneration from an empty page.
    async fn request_initial_generation(
        &self,
        specification: &str,
    ) -> Result<GenerationStream, GenerationError> {
        self.request_full_regeneration(&Document::empty(), specification)
            .await
    }
}
