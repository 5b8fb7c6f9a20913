//! The rendered document
//!
//! A [`Document`] is the full text of the generated page at one point in
//! time, held as LF-normalized lines. It is never edited in place: patching or
//! regenerating produces a new value that replaces the old one wholesale.

use crate::hash::ContentHash;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Immutable, content-hashed sequence of text lines
///
/// # Invariants
/// - No line contains `\n` or `\r`
/// - `hash` is always `ContentHash::compute_lines(lines)`
/// - Cheap to clone (shared line storage)
#[derive(Debug, Clone)]
pub struct Document {
    lines: Arc<[String]>,
    hash: ContentHash,
}

impl Document {
    /// Document with no lines
    #[must_use]
    pub fn empty() -> Self {
        Self::from_lines(Vec::new())
    }

    /// Build from raw text
    ///
    /// `\r\n` and lone `\r` are normalized to `\n`. A single trailing newline
    /// does not produce an extra empty line.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let normalized;
        let text = if text.contains('\r') {
            normalized = text.replace("\r\n", "\n").replace('\r', "\n");
            normalized.as_str()
        } else {
            text
        };

        let body = text.strip_suffix('\n').unwrap_or(text);
        if text.is_empty() {
            return Self::empty();
        }
        Self::from_lines(body.split('\n').map(str::to_owned).collect())
    }

    /// Build from lines that are already split
    ///
    /// Lines containing line breaks are re-split so the invariant holds.
    #[must_use]
    pub fn from_lines(lines: Vec<String>) -> Self {
        let lines: Vec<String> = if lines.iter().any(|l| l.contains(['\n', '\r'])) {
            lines
                .iter()
                .flat_map(|l| {
                    l.replace("\r\n", "\n")
                        .replace('\r', "\n")
                        .split('\n')
                        .map(str::to_owned)
                        .collect::<Vec<_>>()
                })
                .collect()
        } else {
            lines
        };
        let hash = ContentHash::compute_lines(&lines);
        Self {
            lines: lines.into(),
            hash,
        }
    }

    /// All lines
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Line at 0-based `index`
    #[inline]
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Number of lines
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when there are no lines
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Content hash of the line count and canonical text
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Canonical text: lines joined with `\n`, no trailing newline
    #[must_use]
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.lines == other.lines
    }
}

impl Eq for Document {}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Self::from_text(&text)
    }
}

impl serde::Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        Ok(Self::from_text(&text))
    }
}
