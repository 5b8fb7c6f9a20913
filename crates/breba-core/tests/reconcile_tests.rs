//! End-to-end edit reconciliation against a scripted generation service.

use breba_core::prelude::*;
use breba_core::GenerationError;
use breba_diff::PatchApplyError;
use breba_test_utils::{
    card_page, init_tracing, oversized_diff, ScriptedGenerationService, CARD_DIFF, CARD_PAGE_B,
    LANDING_PAGE,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::mpsc;

fn reconciler_for(
    service: &Arc<ScriptedGenerationService>,
    config: ReconcileConfig,
) -> (EditReconciler, mpsc::UnboundedReceiver<RenderEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let service: Arc<dyn GenerationService> = service.clone();
    (EditReconciler::new(service, config).with_render_events(tx), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<RenderEvent>) -> Vec<RenderEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn fragments(events: &[RenderEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            RenderEvent::Fragment(html) => Some(html.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn targeted_diff_is_applied() {
    init_tracing();
    let service = Arc::new(ScriptedGenerationService::new().with_diff(CARD_DIFF));
    let (reconciler, mut rx) = reconciler_for(&service, ReconcileConfig::new());

    let outcome = reconciler
        .reconcile_edit(&card_page(), "use class b")
        .await
        .unwrap();

    assert!(outcome.applied_via_diff);
    assert!(outcome.fallback_reason.is_none());
    assert_eq!(outcome.document.to_text(), CARD_PAGE_B);
    assert!(outcome.diff.contains("+<div class=\"b\">"));
    assert_eq!(service.regeneration_calls(), 0);
    assert_eq!(service.instructions(), vec!["use class b".to_string()]);
    assert_eq!(
        drain(&mut rx),
        vec![
            RenderEvent::Document(CARD_PAGE_B.to_string()),
            RenderEvent::Completed
        ]
    );
}

#[tokio::test]
async fn fenced_diff_is_unwrapped() {
    let fenced = format!("```diff\n{CARD_DIFF}```\n");
    let service = Arc::new(ScriptedGenerationService::new().with_diff(&fenced));
    let (reconciler, _rx) = reconciler_for(&service, ReconcileConfig::new());

    let outcome = reconciler.reconcile_edit(&card_page(), "b").await.unwrap();
    assert!(outcome.applied_via_diff);
    assert_eq!(outcome.document.to_text(), CARD_PAGE_B);
}

#[tokio::test]
async fn oversized_diff_stream_falls_back_to_regeneration() {
    init_tracing();
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff(&oversized_diff(50))
            .with_page(CARD_PAGE_B, 8),
    );
    let (reconciler, mut rx) =
        reconciler_for(&service, ReconcileConfig::new().with_max_diff_lines(10));

    let outcome = reconciler.reconcile_edit(&card_page(), "b").await.unwrap();

    assert!(!outcome.applied_via_diff);
    assert_eq!(
        outcome.fallback_reason,
        Some(ReconcileError::DiffTooLarge { limit: 10 })
    );
    assert_eq!(outcome.document.to_text(), CARD_PAGE_B);
    // stream was dropped on the line that crossed the limit
    assert_eq!(service.diff_chunks_pulled(), 11);
    assert_eq!(service.regeneration_calls(), 1);

    let events = drain(&mut rx);
    assert_eq!(fragments(&events), CARD_PAGE_B);
    assert_eq!(events.last(), Some(&RenderEvent::Completed));
}

#[tokio::test]
async fn drifted_base_falls_back() {
    let drifted = Document::from_text(&breba_test_utils::CARD_PAGE.replace("\"a\"", "\"x\""));
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff(CARD_DIFF)
            .with_page(CARD_PAGE_B, 5),
    );
    let (reconciler, _rx) = reconciler_for(&service, ReconcileConfig::new());

    let outcome = reconciler.reconcile_edit(&drifted, "b").await.unwrap();

    assert!(!outcome.applied_via_diff);
    assert!(matches!(
        outcome.fallback_reason,
        Some(ReconcileError::Patch(PatchApplyError::RemovalMismatch { line: 3, .. }))
    ));
    assert_eq!(outcome.document.to_text(), CARD_PAGE_B);
}

#[tokio::test]
async fn malformed_diff_falls_back() {
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff("Sure! Here is the updated page.")
            .with_page(CARD_PAGE_B, 64),
    );
    let (reconciler, _rx) = reconciler_for(&service, ReconcileConfig::new());

    let outcome = reconciler.reconcile_edit(&card_page(), "b").await.unwrap();
    let reason = outcome.fallback_reason.unwrap();
    assert!(reason.is_recoverable());
    assert!(matches!(reason, ReconcileError::Patch(ref e) if e.is_malformed()));
}

#[tokio::test]
async fn diff_service_failures_fall_back() {
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff_error(GenerationError::service("timeout"))
            .with_page(CARD_PAGE_B, 16)
            .with_diff_interrupted(
                vec!["--- before\n".to_string()],
                GenerationError::interrupted("reset"),
            )
            .with_page(CARD_PAGE_B, 16),
    );
    let (reconciler, _rx) = reconciler_for(&service, ReconcileConfig::new());

    let first = reconciler.reconcile_edit(&card_page(), "b").await.unwrap();
    assert_eq!(
        first.fallback_reason,
        Some(ReconcileError::Generation(GenerationError::service("timeout")))
    );
    // recovered on the diff path even though the same error returned is fatal
    assert!(first.fell_back());
    assert!(!first.applied_via_diff);
    assert_eq!(first.document.to_text(), CARD_PAGE_B);
    assert!(first.fallback_reason.as_ref().is_some_and(ReconcileError::is_fatal));

    let second = reconciler.reconcile_edit(&card_page(), "b").await.unwrap();
    assert_eq!(
        second.fallback_reason,
        Some(ReconcileError::Generation(GenerationError::interrupted("reset")))
    );
    assert_eq!(service.regeneration_calls(), 2);
}

#[tokio::test]
async fn regeneration_failure_is_fatal() {
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff_error(GenerationError::service("timeout"))
            .with_regeneration_error(GenerationError::service("model unavailable")),
    );
    let (reconciler, mut rx) = reconciler_for(&service, ReconcileConfig::new());

    let err = reconciler
        .reconcile_edit(&card_page(), "b")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReconcileError::Generation(GenerationError::service("model unavailable"))
    );
    assert!(err.is_fatal());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn stream_without_completion_is_rejected() {
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff_error(GenerationError::service("timeout"))
            .with_regeneration(vec![
                GenerationChunk::partial("<html><body>"),
                GenerationChunk::partial("<p>half</p>"),
            ]),
    );
    let (reconciler, _rx) = reconciler_for(&service, ReconcileConfig::new());

    let err = reconciler.reconcile_edit(&card_page(), "b").await.unwrap_err();
    assert_eq!(err, ReconcileError::IncompleteStream);
}

#[tokio::test]
async fn empty_completion_uses_streamed_fragments() {
    let mut chunks: Vec<GenerationChunk> = breba_test_utils::chunk_text(LANDING_PAGE, 9)
        .into_iter()
        .map(GenerationChunk::partial)
        .collect();
    chunks.push(GenerationChunk::done());

    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff_error(GenerationError::service("timeout"))
            .with_regeneration(chunks),
    );
    let (reconciler, mut rx) = reconciler_for(&service, ReconcileConfig::new());

    let outcome = reconciler.reconcile_edit(&card_page(), "bakery").await.unwrap();
    assert_eq!(outcome.document.to_text(), LANDING_PAGE);
    assert_eq!(fragments(&drain(&mut rx)), LANDING_PAGE);
}

#[tokio::test]
async fn unclosed_tail_is_drained_into_the_document() {
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff_error(GenerationError::service("timeout"))
            .with_regeneration(vec![
                GenerationChunk::partial("<p>one</p><p>tw"),
                GenerationChunk::partial("o"),
                GenerationChunk::done(),
            ]),
    );
    let (reconciler, mut rx) = reconciler_for(&service, ReconcileConfig::new());

    let outcome = reconciler.reconcile_edit(&card_page(), "b").await.unwrap();
    assert_eq!(outcome.document.to_text(), "<p>one</p><p>two");
    assert_eq!(
        drain(&mut rx),
        vec![
            RenderEvent::Fragment("<p>one</p>".to_string()),
            RenderEvent::Fragment("<p>two".to_string()),
            RenderEvent::Completed,
        ]
    );
}

#[tokio::test]
async fn empty_regeneration_is_rejected() {
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff_error(GenerationError::service("timeout"))
            .with_regeneration(vec![GenerationChunk::partial("  "), GenerationChunk::done()]),
    );
    let (reconciler, _rx) = reconciler_for(&service, ReconcileConfig::new());

    let err = reconciler.reconcile_edit(&card_page(), "b").await.unwrap_err();
    assert_eq!(err, ReconcileError::EmptyDocument);
}

#[tokio::test]
async fn initial_generation_streams_a_page() {
    let service = Arc::new(ScriptedGenerationService::new().with_page(LANDING_PAGE, 11));
    let (reconciler, mut rx) = reconciler_for(&service, ReconcileConfig::new());

    let document = reconciler.generate("A bakery landing page").await.unwrap();

    assert_eq!(document.to_text(), LANDING_PAGE);
    assert_eq!(service.initial_calls(), 1);
    assert_eq!(service.diff_calls(), 0);
    let events = drain(&mut rx);
    assert_eq!(fragments(&events), LANDING_PAGE);
    assert_eq!(events.last(), Some(&RenderEvent::Completed));
}

#[tokio::test]
async fn render_events_can_be_disabled() {
    let service = Arc::new(ScriptedGenerationService::new().with_diff(CARD_DIFF));
    let (reconciler, mut rx) =
        reconciler_for(&service, ReconcileConfig::new().with_render_events(false));

    reconciler.reconcile_edit(&card_page(), "b").await.unwrap();
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn dropped_receiver_does_not_fail_the_edit() {
    let service = Arc::new(ScriptedGenerationService::new().with_page(LANDING_PAGE, 4));
    let (reconciler, rx) = reconciler_for(&service, ReconcileConfig::new());
    drop(rx);

    assert!(reconciler.generate("bakery").await.is_ok());
}

#[tokio::test]
async fn custom_root_tag_ends_the_stream() {
    let svg = "<svg><circle r=\"4\"></circle></svg>";
    let service = Arc::new(ScriptedGenerationService::new().with_regeneration(vec![
        GenerationChunk::partial(svg),
        GenerationChunk::partial("<p>ignored</p>"),
        GenerationChunk::done(),
    ]));
    let (reconciler, _rx) = reconciler_for(&service, ReconcileConfig::new().with_root_tag("svg"));

    let document = reconciler.generate("a dot").await.unwrap();
    assert_eq!(document.to_text(), svg);
}

#[tokio::test]
async fn config_loaded_from_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("breba.toml");
    std::fs::write(&path, "max_diff_lines = 3\nemit_render_events = false\n")?;

    let config = ReconcileConfig::from_file(&path)?;
    let service = Arc::new(
        ScriptedGenerationService::new()
            .with_diff(CARD_DIFF)
            .with_page(CARD_PAGE_B, 10),
    );
    let (reconciler, mut rx) = reconciler_for(&service, config);

    let outcome = reconciler.reconcile_edit(&card_page(), "b").await?;
    assert!(!outcome.applied_via_diff);
    assert_eq!(
        outcome.fallback_reason,
        Some(ReconcileError::DiffTooLarge { limit: 3 })
    );
    assert!(drain(&mut rx).is_empty());
    Ok(())
}
