//! Tag accumulator
//!
//! Model output arrives in arbitrary chunks that can split a tag anywhere.
//! [`TagAccumulator`] buffers the stream and releases text only up to the
//! end of the last complete closing tag seen so far, so every emitted piece
//! is a prefix of well-formed markup that a live preview can render.
//!
//! # States
//!
//! ```text
//! Accumulating --(emitted text contains </root>)--> Done
//! ```
//!
//! Done is terminal: later input is discarded and every call returns `""`.

use regex::Regex;
use std::sync::OnceLock;

/// Root element whose closing tag ends the document
pub const DEFAULT_ROOT_TAG: &str = "html";

fn closing_tag() -> &'static Regex {
    static CLOSING_TAG: OnceLock<Regex> = OnceLock::new();
    CLOSING_TAG.get_or_init(|| {
        Regex::new(r"</[A-Za-z][A-Za-z0-9:._-]*\s*>").unwrap_or_else(|e| unreachable!("{e}"))
    })
}

fn root_closing_tag(root: &str) -> Regex {
    let pattern = format!(r"(?i)</{}\s*>", regex::escape(root));
    Regex::new(&pattern).unwrap_or_else(|e| unreachable!("escaped root tag always compiles: {e}"))
}

/// Buffers streamed HTML and emits complete closing-tag groups
#[derive(Debug, Clone)]
pub struct TagAccumulator {
    buffer: String,
    done: bool,
    root: String,
    root_close: Regex,
}

impl TagAccumulator {
    /// Accumulator that completes on `</html>`
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(DEFAULT_ROOT_TAG)
    }

    /// Accumulator that completes on `</{root}>`
    #[must_use]
    pub fn with_root(root: &str) -> Self {
        Self {
            buffer: String::new(),
            done: false,
            root: root.to_string(),
            root_close: root_closing_tag(root),
        }
    }

    /// Feed one chunk; returns the text that is now safe to forward
    ///
    /// Returns everything buffered up to and including the rightmost
    /// complete closing tag, or `""` when no closing tag is available yet
    /// (keep feeding). The whole buffer is scanned on each call so tags that
    /// span chunk boundaries are found.
    ///
    /// Once a returned piece contains the root closing tag the accumulator is
    /// done and ignores all further input.
    pub fn append_and_return_html(&mut self, chunk: &str) -> String {
        if self.done {
            return String::new();
        }
        self.buffer.push_str(chunk);

        let Some(end) = closing_tag().find_iter(&self.buffer).last().map(|m| m.end()) else {
            return String::new();
        };

        let rest = self.buffer.split_off(end);
        let emitted = std::mem::replace(&mut self.buffer, rest);
        if self.root_close.is_match(&emitted) {
            tracing::debug!(root = %self.root, "root element closed");
            self.done = true;
        }
        emitted
    }

    /// Take whatever has not been emitted yet
    ///
    /// Call when the upstream stream ends, otherwise a trailing fragment that
    /// never closed a tag is lost.
    pub fn drain_buffer(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    /// True once the root element has been closed
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Bytes currently held back
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for TagAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
