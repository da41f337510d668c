mod common;

use common::{Call, ScriptedEngine};
use sqlpad::model::{ExecutionOutcome, SelectionScope};
use sqlpad::query::{QueryOrchestrator, EMPTY_QUERY_MESSAGE};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_selection_takes_precedence() {
    let engine = ScriptedEngine::new();
    let orchestrator = QueryOrchestrator::new(engine.clone());
    let buffer = "SELECT * FROM users;\nSELECT * FROM posts;";

    let run = orchestrator
        .run_query(buffer, &SelectionScope::from_selection("SELECT * FROM posts;"))
        .await;
    assert_eq!(run.executed_sql, "SELECT * FROM posts;");

    let run = orchestrator
        .run_query(buffer, &SelectionScope::from_selection(""))
        .await;
    assert_eq!(run.executed_sql, buffer);

    assert_eq!(
        engine.calls(),
        vec![
            Call::Query("SELECT * FROM posts;".to_string()),
            Call::Query(buffer.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_success_reports_rows_and_timing() {
    let engine = ScriptedEngine::new();
    engine.rows_for("SELECT * FROM users;", 10);
    let orchestrator = QueryOrchestrator::new(engine.clone());

    let run = orchestrator
        .run_query("SELECT * FROM users;", &SelectionScope::WholeBuffer)
        .await;

    assert_eq!(run.row_count(), Some(10));
    let elapsed = run.outcome.elapsed_ms().unwrap();
    assert!(elapsed.is_finite() && elapsed >= 0.0);
    assert!(!run.superseded);
    assert_eq!(orchestrator.visible_rows().len(), 10);
    assert_eq!(orchestrator.visible_token(), run.token);
    assert!(orchestrator.last_error().is_none());
}

#[tokio::test]
async fn test_failure_has_no_location_and_clears_rows() {
    let engine = ScriptedEngine::new();
    engine.fail_on("SELECT * FROM nope;", "no such table: nope");
    let orchestrator = QueryOrchestrator::new(engine.clone());

    orchestrator
        .run_query("SELECT 1;", &SelectionScope::WholeBuffer)
        .await;
    assert_eq!(orchestrator.visible_rows().len(), 1);

    let run = orchestrator
        .run_query("SELECT * FROM nope;", &SelectionScope::WholeBuffer)
        .await;
    assert_eq!(
        run.outcome,
        ExecutionOutcome::Failure {
            message: "no such table: nope".to_string(),
            location: None,
        }
    );
    assert!(orchestrator.visible_rows().is_empty());
    assert_eq!(orchestrator.last_error().unwrap().message, "no such table: nope");

    // A later success clears the query error.
    orchestrator
        .run_query("SELECT 1;", &SelectionScope::WholeBuffer)
        .await;
    assert!(orchestrator.last_error().is_none());
}

#[tokio::test]
async fn test_empty_sql_fails_without_engine_call() {
    let engine = ScriptedEngine::new();
    let orchestrator = QueryOrchestrator::new(engine.clone());

    let run = orchestrator
        .run_query("  \n ", &SelectionScope::WholeBuffer)
        .await;

    assert_eq!(run.outcome.message(), Some(EMPTY_QUERY_MESSAGE));
    assert!(engine.calls().is_empty());
    assert!(!orchestrator.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_most_recent_run_wins() {
    let engine = ScriptedEngine::new();
    engine.delay_on("slow", Duration::from_secs(2));
    engine.rows_for("slow", 5);
    engine.rows_for("fast", 2);
    let orchestrator = Arc::new(QueryOrchestrator::new(engine.clone()));

    let slow = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .run_query("slow", &SelectionScope::WholeBuffer)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(orchestrator.is_loading());

    let fast = orchestrator
        .run_query("fast", &SelectionScope::WholeBuffer)
        .await;
    assert!(!fast.superseded);
    assert_eq!(orchestrator.visible_rows().len(), 2);

    let slow = slow.await.unwrap();
    assert!(slow.superseded);
    assert_eq!(slow.row_count(), Some(5));

    // The stale run did not overwrite the newer result.
    assert_eq!(orchestrator.visible_token(), fast.token);
    assert_eq!(orchestrator.visible_rows().len(), 2);
    assert!(!orchestrator.is_loading());
}
