//! Reconciliation configuration

use crate::error::ReconcileError;
use breba_diff::DEFAULT_CONTEXT_LINES;
use breba_stream::DEFAULT_ROOT_TAG;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning for [`EditReconciler`](crate::EditReconciler)
///
/// Every field has a default, so a TOML table only needs the keys it changes:
///
/// ```toml
/// max_diff_lines = 200
/// root_tag = "svg"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Lines a targeted diff may reach before falling back to regeneration
    pub max_diff_lines: usize,
    /// Context radius of diffs reported in outcomes
    pub context_lines: usize,
    /// Element whose closing tag ends a regenerated document
    pub root_tag: String,
    /// Forward render events to the attached channel
    pub emit_render_events: bool,
}

impl ReconcileConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With targeted diff line limit
    #[inline]
    #[must_use]
    pub fn with_max_diff_lines(mut self, max: usize) -> Self {
        self.max_diff_lines = max;
        self
    }

    /// With diff context radius
    #[inline]
    #[must_use]
    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// With root element tag
    #[inline]
    #[must_use]
    pub fn with_root_tag(mut self, tag: impl Into<String>) -> Self {
        self.root_tag = tag.into();
        self
    }

    /// Enable or disable render events
    #[inline]
    #[must_use]
    pub fn with_render_events(mut self, enabled: bool) -> Self {
        self.emit_render_events = enabled;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// `Config` if the TOML is invalid or a value is out of range
    pub fn from_toml_str(text: &str) -> Result<Self, ReconcileError> {
        let config: Self = toml::from_str(text).map_err(|e| ReconcileError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `Config` if the file cannot be read or [`Self::from_toml_str`] fails
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReconcileError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReconcileError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    ///
    /// # Errors
    /// `Config` if serialization fails
    pub fn to_toml_string(&self) -> Result<String, ReconcileError> {
        toml::to_string(self).map_err(|e| ReconcileError::config(e.to_string()))
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `Config` naming the offending field
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.max_diff_lines == 0 {
            return Err(ReconcileError::config("max_diff_lines must be at least 1"));
        }
        if !is_tag_name(&self.root_tag) {
            return Err(ReconcileError::config(format!(
                "root_tag {:?} is not an element name",
                self.root_tag
            )));
        }
        Ok(())
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_diff_lines: 400,
            context_lines: DEFAULT_CONTEXT_LINES,
            root_tag: DEFAULT_ROOT_TAG.to_string(),
            emit_render_events: true,
        }
    }
}

fn is_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '_' | '-'))
}
