//! Session storage, edit serialization and specification hand-off.

use async_trait::async_trait;
use breba_core::prelude::*;
use breba_core::{
    revise_specification, GenerationError, GenerationStream, SpecRevision, TextStream,
};
use breba_test_utils::{
    card_page, ScriptedAgent, ScriptedGenerationService, CARD_DIFF, CARD_PAGE_B, LANDING_PAGE,
};
use futures::stream::{self, StreamExt};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::Notify;

const CARD_DIFF_B_TO_C: &str = "--- before\n+++ after\n@@ -3 +3 @@\n-<div class=\"b\">\n+<div class=\"c\">\n";

fn reconciler(service: Arc<ScriptedGenerationService>) -> EditReconciler {
    EditReconciler::new(service, ReconcileConfig::new())
}

#[tokio::test]
async fn edit_commits_to_the_session() {
    let service = Arc::new(ScriptedGenerationService::new().with_diff(CARD_DIFF));
    let reconciler = reconciler(service);
    let store = SessionStore::new();
    let id = SessionId::new();
    store.set_document(id, card_page());

    let session = store.get(&id).unwrap();
    let outcome = session.edit(&reconciler, "b").await.unwrap();

    assert!(outcome.applied_via_diff);
    assert_eq!(store.document(&id).unwrap().to_text(), CARD_PAGE_B);
}

#[tokio::test]
async fn concurrent_edits_are_serialized() {
    // the second diff only applies on top of the first edit's result
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff(CARD_DIFF)
            .with_diff(CARD_DIFF_B_TO_C),
    );
    let reconciler = reconciler(service.clone());
    let session = EditSession::with_document(SessionId::new(), card_page());

    let (first, second) = tokio::join!(
        session.edit(&reconciler, "b"),
        session.edit(&reconciler, "c")
    );

    assert!(first.unwrap().applied_via_diff);
    assert!(second.unwrap().applied_via_diff);
    assert_eq!(service.regeneration_calls(), 0);
    assert!(session.document().to_text().contains("class=\"c\""));
}

#[tokio::test]
async fn failed_edit_leaves_the_page_alone() {
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff_error(GenerationError::service("timeout"))
            .with_regeneration_error(GenerationError::service("down")),
    );
    let reconciler = reconciler(service);
    let session = EditSession::with_document(SessionId::new(), card_page());

    assert!(session.edit(&reconciler, "b").await.is_err());
    assert_eq!(session.document(), card_page());
}

/// Regeneration that waits for the test to release it
struct GatedService {
    gate: Arc<Notify>,
}

#[async_trait]
impl GenerationService for GatedService {
    async fn request_targeted_diff(
        &self,
        _current: &Document,
        _instruction: &str,
    ) -> Result<TextStream, GenerationError> {
        Err(GenerationError::service("diffs disabled"))
    }

    async fn request_full_regeneration(
        &self,
        _current: &Document,
        _instruction: &str,
    ) -> Result<GenerationStream, GenerationError> {
        self.gate.notified().await;
        Ok(stream::iter(vec![Ok(GenerationChunk::complete(LANDING_PAGE))]).boxed())
    }
}

#[tokio::test]
async fn replacement_during_edit_is_a_stale_base() {
    let gate = Arc::new(Notify::new());
    let reconciler = EditReconciler::new(
        Arc::new(GatedService { gate: gate.clone() }),
        ReconcileConfig::new(),
    );
    let session = EditSession::with_document(SessionId::new(), card_page());
    let replaced = Document::from_text("<p>edited elsewhere</p>");

    let (result, ()) = tokio::join!(session.edit(&reconciler, "bakery"), async {
        session.replace(replaced.clone());
        gate.notify_one();
    });

    match result {
        Err(ReconcileError::StaleBase { expected, actual }) => {
            assert_eq!(&expected, card_page().hash());
            assert_eq!(&actual, replaced.hash());
        }
        other => panic!("expected stale base, got {other:?}"),
    }
    assert_eq!(session.document(), replaced);
}

#[tokio::test]
async fn generate_commits_first_render() {
    let service = Arc::new(ScriptedGenerationService::new().with_page(LANDING_PAGE, 13));
    let reconciler = reconciler(service);
    let store = SessionStore::new();
    let session = store.create();

    let document = session.generate(&reconciler, "bakery").await.unwrap();
    assert_eq!(document.to_text(), LANDING_PAGE);
    assert_eq!(store.document(&session.id()).unwrap(), document);
}

#[tokio::test]
async fn revision_receives_instruction_and_diff() {
    let service = Arc::new(ScriptedGenerationService::new().with_diff(CARD_DIFF));
    let reconciler = reconciler(service);
    let agent = ScriptedAgent::new().with_reply("# Site\nDivs use class b.", true);
    let session = EditSession::with_document(SessionId::new(), card_page());

    let outcome = session.edit(&reconciler, "use class b").await.unwrap();
    let revision = revise_specification(&agent, &session.id(), "use class b", &outcome)
        .await
        .unwrap();

    assert_eq!(
        revision,
        SpecRevision::Revised("# Site\nDivs use class b.".to_string())
    );
    let messages = agent.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, session.id());
    assert!(messages[0].1.starts_with("use class b"));
    assert!(messages[0].1.contains("+<div class=\"b\">"));
}

#[tokio::test]
async fn revision_can_ask_for_input() {
    let service = Arc::new(ScriptedGenerationService::new().with_diff(CARD_DIFF));
    let outcome = reconciler(service)
        .reconcile_edit(&card_page(), "b")
        .await
        .unwrap();
    let agent = ScriptedAgent::new().with_reply("Which pages should change?", false);

    let revision = revise_specification(&agent, &SessionId::new(), "b", &outcome)
        .await
        .unwrap();
    assert_eq!(
        revision,
        SpecRevision::NeedsInput("Which pages should change?".to_string())
    );
}

#[tokio::test]
async fn unchanged_edit_skips_the_agent() {
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff_error(GenerationError::service("timeout"))
            .with_page(breba_test_utils::CARD_PAGE, 6),
    );
    let outcome = reconciler(service)
        .reconcile_edit(&card_page(), "no-op")
        .await
        .unwrap();
    assert!(outcome.is_unchanged());

    let agent = ScriptedAgent::new();
    let revision = revise_specification(&agent, &SessionId::new(), "no-op", &outcome)
        .await
        .unwrap();
    assert_eq!(revision, SpecRevision::Unchanged);
    assert!(agent.messages().is_empty());
}

#[tokio::test]
async fn agent_failure_is_reported() {
    let service = Arc::new(ScriptedGenerationService::new().with_diff(CARD_DIFF));
    let outcome = reconciler(service)
        .reconcile_edit(&card_page(), "b")
        .await
        .unwrap();

    let err = revise_specification(&ScriptedAgent::new(), &SessionId::new(), "b", &outcome)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Generation(_)));
}
