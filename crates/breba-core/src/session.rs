//! Per-session document storage
//!
//! Each collaboration session owns one current page. Edits on a session are
//! serialized; the page itself is replaced as a whole value, never patched in
//! place, so readers always see a complete document.

use crate::error::ReconcileError;
use crate::workflow::{EditReconciler, ReconcileOutcome};
use breba_document::{ContentHash, Document};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use ulid::Ulid;

/// Unique session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// One session's current page
#[derive(Debug)]
pub struct EditSession {
    id: SessionId,
    document: RwLock<Document>,
    edit_lock: Mutex<()>,
}

impl EditSession {
    /// Session with an empty page
    #[inline]
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self::with_document(id, Document::empty())
    }

    /// Session starting from `document`
    #[inline]
    #[must_use]
    pub fn with_document(id: SessionId, document: Document) -> Self {
        Self {
            id,
            document: RwLock::new(document),
            edit_lock: Mutex::new(()),
        }
    }

    /// Get session ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Snapshot of the current page
    #[inline]
    #[must_use]
    pub fn document(&self) -> Document {
        self.document.read().clone()
    }

    /// Replace the page unconditionally
    pub fn replace(&self, document: Document) {
        tracing::debug!(session = %self.id, result = %document.hash().short(), "page replaced");
        *self.document.write() = document;
    }

    /// Run an edit and commit its result
    ///
    /// Holds the session's edit lock for the whole reconcile, so a second edit
    /// waits until this one has committed and then starts from its result.
    ///
    /// # Errors
    /// - anything [`EditReconciler::reconcile_edit`] returns
    /// - `StaleBase` if the page was replaced while the edit ran
    pub async fn edit(
        &self,
        reconciler: &EditReconciler,
        instruction: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let _guard = self.edit_lock.lock().await;
        let base = self.document();
        let outcome = reconciler.reconcile_edit(&base, instruction).await?;
        self.commit(base.hash(), outcome.document.clone())?;
        Ok(outcome)
    }

    /// Render a page from a specification and commit it
    ///
    /// # Errors
    /// - anything [`EditReconciler::generate`] returns
    /// - `StaleBase` if the page was replaced meanwhile
    pub async fn generate(
        &self,
        reconciler: &EditReconciler,
        specification: &str,
    ) -> Result<Document, ReconcileError> {
        let _guard = self.edit_lock.lock().await;
        let base_hash = *self.document.read().hash();
        let document = reconciler.generate(specification).await?;
        self.commit(&base_hash, document.clone())?;
        Ok(document)
    }

    fn commit(&self, expected: &ContentHash, document: Document) -> Result<(), ReconcileError> {
        let mut current = self.document.write();
        if current.hash() != expected {
            tracing::warn!(session = %self.id, "page changed during edit, result dropped");
            return Err(ReconcileError::StaleBase {
                expected: *expected,
                actual: *current.hash(),
            });
        }
        tracing::debug!(session = %self.id, result = %document.hash().short(), "page committed");
        *current = document;
        Ok(())
    }
}

/// Registry of live sessions
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<EditSession>>,
}

impl SessionStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session with an empty page
    pub fn create(&self) -> Arc<EditSession> {
        self.get_or_create(SessionId::new())
    }

    /// Existing session, or a new one with an empty page
    pub fn get_or_create(&self, id: SessionId) -> Arc<EditSession> {
        let entry = self
            .sessions
            .entry(id)
            .or_insert_with(|| Arc::new(EditSession::new(id)));
        Arc::clone(entry.value())
    }

    /// Get session
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Arc<EditSession>> {
        self.sessions.get(id).map(|s| Arc::clone(s.value()))
    }

    /// Close session
    pub fn remove(&self, id: &SessionId) -> Option<Arc<EditSession>> {
        self.sessions.remove(id).map(|(_, s)| s)
    }

    /// Current page of a session
    #[must_use]
    pub fn document(&self, id: &SessionId) -> Option<Document> {
        self.get(id).map(|s| s.document())
    }

    /// Replace a session's page, opening the session if needed
    pub fn set_document(&self, id: SessionId, document: Document) {
        self.get_or_create(id).replace(document);
    }

    /// Number of sessions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if no sessions are open
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
