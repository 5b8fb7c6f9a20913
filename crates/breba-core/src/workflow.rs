//! Edit reconciliation workflow
//!
//! An edit first asks the model for a targeted diff. If that diff is too
//! large, malformed, does not match the current page, or the service fails,
//! the edit falls back to a streamed full regeneration.
//!
//! # Workflow
//! 1. Collect the diff stream, cancelling it past `max_diff_lines`
//! 2. Strip a Markdown code fence, apply the diff strictly
//! 3. On any failure of 1-2: regenerate through a [`TagAccumulator`]
//! 4. Report `diff(old, new)` with the outcome

use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::generation::{GenerationService, GenerationStream};
use breba_document::Document;
use breba_stream::TagAccumulator;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Live update for a preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// Complete tag group from a streamed render
    Fragment(String),
    /// Whole page after a targeted diff was applied
    Document(String),
    /// Edit or generation finished
    Completed,
}

/// Result of a successful edit
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The updated page
    pub document: Document,
    /// True when the targeted diff applied, false after regeneration
    pub applied_via_diff: bool,
    /// Unified diff from the previous page to `document`
    pub diff: String,
    /// Why the targeted diff was abandoned, if it was
    ///
    /// Always a recovered failure, including a `Generation` error that
    /// [`ReconcileError::is_fatal`] would report as fatal had it been returned.
    pub fallback_reason: Option<ReconcileError>,
}

impl ReconcileOutcome {
    /// True if the edit left the page unchanged
    #[inline]
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.diff.is_empty()
    }

    /// True if the page came from full regeneration
    #[inline]
    #[must_use]
    pub fn fell_back(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Drives edits against a generation service
pub struct EditReconciler {
    service: Arc<dyn GenerationService>,
    config: ReconcileConfig,
    events: Option<mpsc::UnboundedSender<RenderEvent>>,
}

impl std::fmt::Debug for EditReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditReconciler")
            .field("config", &self.config)
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

impl EditReconciler {
    /// Create reconciler
    #[inline]
    #[must_use]
    pub fn new(service: Arc<dyn GenerationService>, config: ReconcileConfig) -> Self {
        Self {
            service,
            config,
            events: None,
        }
    }

    /// Forward render events to `sender`
    #[inline]
    #[must_use]
    pub fn with_render_events(mut self, sender: mpsc::UnboundedSender<RenderEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Apply an edit instruction to `current`
    ///
    /// `current` is never modified; the outcome carries the new page.
    ///
    /// # Errors
    /// Only the regeneration path can fail the edit:
    /// - `Generation` if the service fails
    /// - `IncompleteStream` if the stream ends without a completion chunk
    /// - `EmptyDocument` if it completes with nothing
    pub async fn reconcile_edit(
        &self,
        current: &Document,
        instruction: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        tracing::info!(
            base = %current.hash().short(),
            lines = current.len(),
            "reconciling edit"
        );

        let (document, applied_via_diff, fallback_reason) =
            match self.try_targeted_diff(current, instruction).await {
                Ok(updated) => {
                    tracing::info!(result = %updated.hash().short(), "targeted diff applied");
                    self.emit(RenderEvent::Document(updated.to_text()));
                    (updated, true, None)
                }
                Err(reason) => {
                    tracing::warn!(error = %reason, "targeted diff failed, regenerating");
                    let stream = self
                        .service
                        .request_full_regeneration(current, instruction)
                        .await?;
                    let updated = self.collect_regeneration(stream).await?;
                    tracing::info!(result = %updated.hash().short(), "page regenerated");
                    (updated, false, Some(reason))
                }
            };
        self.emit(RenderEvent::Completed);

        let diff = breba_diff::diff_with_context(current, &document, self.config.context_lines);
        Ok(ReconcileOutcome {
            document,
            applied_via_diff,
            diff,
            fallback_reason,
        })
    }

    /// Render a page from a site specification
    ///
    /// # Errors
    /// Same as the regeneration path of [`Self::reconcile_edit`]
    pub async fn generate(&self, specification: &str) -> Result<Document, ReconcileError> {
        tracing::info!(chars = specification.len(), "generating page");
        let stream = self
            .service
            .request_initial_generation(specification)
            .await?;
        let document = self.collect_regeneration(stream).await?;
        self.emit(RenderEvent::Completed);
        tracing::info!(result = %document.hash().short(), lines = document.len(), "page generated");
        Ok(document)
    }

    async fn try_targeted_diff(
        &self,
        current: &Document,
        instruction: &str,
    ) -> Result<Document, ReconcileError> {
        let limit = self.config.max_diff_lines;
        let mut stream = self
            .service
            .request_targeted_diff(current, instruction)
            .await?;

        let mut text = String::new();
        let mut newlines = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            newlines += chunk.matches('\n').count();
            text.push_str(&chunk);

            let lines = newlines + usize::from(!text.is_empty() && !text.ends_with('\n'));
            if lines > limit {
                tracing::debug!(lines, limit, "diff stream cancelled");
                return Err(ReconcileError::DiffTooLarge { limit });
            }
        }
        tracing::debug!(lines = newlines, "diff stream finished");

        Ok(breba_diff::apply(current, strip_code_fence(&text))?)
    }

    async fn collect_regeneration(
        &self,
        mut stream: GenerationStream,
    ) -> Result<Document, ReconcileError> {
        let mut accumulator = TagAccumulator::with_root(&self.config.root_tag);
        let mut assembled = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_complete {
                let text = if chunk.content.trim().is_empty() {
                    let rest = accumulator.drain_buffer();
                    self.forward_fragment(&mut assembled, rest);
                    assembled
                } else {
                    chunk.content
                };
                if text.trim().is_empty() {
                    return Err(ReconcileError::EmptyDocument);
                }
                return Ok(Document::from_text(&text));
            }

            let html = accumulator.append_and_return_html(&chunk.content);
            self.forward_fragment(&mut assembled, html);
        }

        tracing::debug!(pending = accumulator.pending_len(), "stream ended early");
        Err(ReconcileError::IncompleteStream)
    }

    fn forward_fragment(&self, assembled: &mut String, html: String) {
        if html.is_empty() {
            return;
        }
        tracing::debug!(bytes = html.len(), "fragment");
        assembled.push_str(&html);
        self.emit(RenderEvent::Fragment(html));
    }

    fn emit(&self, event: RenderEvent) {
        if !self.config.emit_render_events {
            return;
        }
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                tracing::debug!("render event receiver dropped");
            }
        }
    }
}

/// Body of a Markdown code fence, or `text` unchanged
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body)
}
