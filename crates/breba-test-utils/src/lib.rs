//! Testing utilities for Breba workspace
//!
//! Scripted collaborators, page fixtures and tracing setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use breba_core::{
    AgentReply, GenerationChunk, GenerationError, GenerationService, GenerationStream, SessionId,
    SpecificationAgent, TextStream,
};
use breba_document::Document;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Five-line page used across the reconcile tests
pub const CARD_PAGE: &str = "<html>\n<body>\n<div class=\"a\">\n</body>\n</html>";

/// `CARD_PAGE` with the div class changed to `b`
pub const CARD_PAGE_B: &str = "<html>\n<body>\n<div class=\"b\">\n</body>\n</html>";

/// Diff turning `CARD_PAGE` into `CARD_PAGE_B`
pub const CARD_DIFF: &str = "--- before\n+++ after\n@@ -2,3 +2,3 @@\n <body>\n-<div class=\"a\">\n+<div class=\"b\">\n </body>\n";

/// A small but complete landing page
pub const LANDING_PAGE: &str = "<html>\n<head><title>Bakery</title></head>\n<body>\n<h1 class=\"hero\">Fresh bread</h1>\n<p>Open <b>daily</b> from 7</p>\n</body>\n</html>";

pub fn card_page() -> Document {
    Document::from_text(CARD_PAGE)
}

/// Diff text with `n` added lines
pub fn oversized_diff(n: usize) -> String {
    let mut text = String::from("--- before\n+++ after\n@@ -0,0 +1,");
    text.push_str(&n.to_string());
    text.push_str(" @@\n");
    for i in 0..n {
        text.push_str(&format!("+<p>{i}</p>\n"));
    }
    text
}

/// Split `text` into pieces of at most `size` chars
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

enum DiffScript {
    Chunks(Vec<String>),
    FailMidStream(Vec<String>, GenerationError),
    Fail(GenerationError),
}

enum RegenerationScript {
    Chunks(Vec<GenerationChunk>),
    Fail(GenerationError),
}

/// Generation service replaying queued responses
///
/// Each request pops the next scripted response of its kind; an exhausted
/// queue answers with a service error.
#[derive(Default)]
pub struct ScriptedGenerationService {
    diffs: Mutex<VecDeque<DiffScript>>,
    regenerations: Mutex<VecDeque<RegenerationScript>>,
    instructions: Mutex<Vec<String>>,
    diff_calls: AtomicUsize,
    regeneration_calls: AtomicUsize,
    initial_calls: AtomicUsize,
    diff_chunks_pulled: Arc<AtomicUsize>,
}

impl ScriptedGenerationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a diff delivered one line per chunk
    pub fn with_diff(self, text: &str) -> Self {
        let chunks = text.split_inclusive('\n').map(str::to_string).collect();
        self.with_diff_chunks(chunks)
    }

    pub fn with_diff_chunks(self, chunks: Vec<String>) -> Self {
        self.diffs.lock().push_back(DiffScript::Chunks(chunks));
        self
    }

    /// Queue a diff stream that breaks after `chunks`
    pub fn with_diff_interrupted(self, chunks: Vec<String>, error: GenerationError) -> Self {
        self.diffs
            .lock()
            .push_back(DiffScript::FailMidStream(chunks, error));
        self
    }

    pub fn with_diff_error(self, error: GenerationError) -> Self {
        self.diffs.lock().push_back(DiffScript::Fail(error));
        self
    }

    pub fn with_regeneration(self, chunks: Vec<GenerationChunk>) -> Self {
        self.regenerations
            .lock()
            .push_back(RegenerationScript::Chunks(chunks));
        self
    }

    /// Queue `page` streamed in `size`-char chunks, completed with the full page
    pub fn with_page(self, page: &str, size: usize) -> Self {
        let mut chunks: Vec<GenerationChunk> = chunk_text(page, size)
            .into_iter()
            .map(GenerationChunk::partial)
            .collect();
        chunks.push(GenerationChunk::complete(page));
        self.with_regeneration(chunks)
    }

    pub fn with_regeneration_error(self, error: GenerationError) -> Self {
        self.regenerations
            .lock()
            .push_back(RegenerationScript::Fail(error));
        self
    }

    pub fn diff_calls(&self) -> usize {
        self.diff_calls.load(Ordering::SeqCst)
    }

    pub fn regeneration_calls(&self) -> usize {
        self.regeneration_calls.load(Ordering::SeqCst)
    }

    pub fn initial_calls(&self) -> usize {
        self.initial_calls.load(Ordering::SeqCst)
    }

    /// Diff chunks actually consumed by the caller
    pub fn diff_chunks_pulled(&self) -> usize {
        self.diff_chunks_pulled.load(Ordering::SeqCst)
    }

    /// Instructions received, in order
    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().clone()
    }

    fn counted(&self, chunks: Vec<String>) -> stream::BoxStream<'static, Result<String, GenerationError>> {
        let pulled = Arc::clone(&self.diff_chunks_pulled);
        stream::iter(chunks)
            .inspect(move |_| {
                pulled.fetch_add(1, Ordering::SeqCst);
            })
            .map(Ok)
            .boxed()
    }

    fn next_regeneration(&self) -> Result<GenerationStream, GenerationError> {
        match self.regenerations.lock().pop_front() {
            Some(RegenerationScript::Chunks(chunks)) => Ok(stream::iter(chunks).map(Ok).boxed()),
            Some(RegenerationScript::Fail(error)) => Err(error),
            None => Err(GenerationError::service("no scripted regeneration")),
        }
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerationService {
    async fn request_targeted_diff(
        &self,
        _current: &Document,
        instruction: &str,
    ) -> Result<TextStream, GenerationError> {
        self.diff_calls.fetch_add(1, Ordering::SeqCst);
        self.instructions.lock().push(instruction.to_string());
        let script = self.diffs.lock().pop_front();
        match script {
            Some(DiffScript::Chunks(chunks)) => Ok(self.counted(chunks)),
            Some(DiffScript::FailMidStream(chunks, error)) => Ok(self
                .counted(chunks)
                .chain(stream::once(async move { Err(error) }))
                .boxed()),
            Some(DiffScript::Fail(error)) => Err(error),
            None => Err(GenerationError::service("no scripted diff")),
        }
    }

    async fn request_full_regeneration(
        &self,
        _current: &Document,
        _instruction: &str,
    ) -> Result<GenerationStream, GenerationError> {
        self.regeneration_calls.fetch_add(1, Ordering::SeqCst);
        self.next_regeneration()
    }

    async fn request_initial_generation(
        &self,
        _specification: &str,
    ) -> Result<GenerationStream, GenerationError> {
        self.initial_calls.fetch_add(1, Ordering::SeqCst);
        self.next_regeneration()
    }
}

/// Builder agent replaying queued replies and recording messages
#[derive(Default)]
pub struct ScriptedAgent {
    replies: Mutex<VecDeque<AgentReply>>,
    messages: Mutex<Vec<(SessionId, String)>>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, content: &str, is_task_complete: bool) -> Self {
        self.replies.lock().push_back(AgentReply {
            content: content.to_string(),
            is_task_complete,
        });
        self
    }

    /// Messages received, in order
    pub fn messages(&self) -> Vec<(SessionId, String)> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl SpecificationAgent for ScriptedAgent {
    async fn invoke(
        &self,
        session: &SessionId,
        message: &str,
    ) -> Result<AgentReply, GenerationError> {
        self.messages.lock().push((*session, message.to_string()));
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| GenerationError::service("no scripted reply"))
    }
}
