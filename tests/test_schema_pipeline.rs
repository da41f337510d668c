mod common;

use common::{Call, ScriptedEngine};
use sqlpad::config::TeardownPolicy;
use sqlpad::schema::{PipelineOptions, SchemaPipeline, SchemaState};
use std::time::Duration;

fn options(ms: u64) -> PipelineOptions {
    PipelineOptions {
        debounce: Duration::from_millis(ms),
        teardown: TeardownPolicy::DropAll,
        clear_error_on_edit: false,
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_applies_last_text_once() {
    let engine = ScriptedEngine::new();
    let pipeline = SchemaPipeline::spawn(engine.clone(), options(500));

    for text in ["CREATE TABLE a (x);", "CREATE TABLE ab (x);", "CREATE TABLE abc (x);"] {
        pipeline.edit(text).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(engine.calls().is_empty());

    let snapshot = pipeline.settled().await.unwrap();
    assert_eq!(
        engine.calls(),
        vec![Call::Reset, Call::Apply("CREATE TABLE abc (x);".to_string())]
    );
    assert_eq!(snapshot.refresh_generation, 1);
    assert!(matches!(snapshot.state, SchemaState::Settled { seq: 3, .. }));

    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_teardown_failure_skips_apply() {
    let engine = ScriptedEngine::new();
    engine.fail_reset("database is locked");
    let pipeline = SchemaPipeline::spawn(engine.clone(), options(500));

    pipeline.edit("CREATE TABLE t (id INTEGER);").unwrap();
    let snapshot = pipeline.settled().await.unwrap();

    assert!(engine.applied().is_empty());
    let error = snapshot.error.unwrap();
    assert_eq!(error.message, "database is locked");
    assert_eq!(error.location, None);
    assert_eq!(snapshot.refresh_generation, 0);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_schema_error_is_located() {
    let schema = "CREATE TABLE users (\n  id INTEGR PRIMARY KEY\n);";
    let engine = ScriptedEngine::new();
    engine.fail_on(schema, "near \"INTEGR\": syntax error");
    let pipeline = SchemaPipeline::spawn(engine.clone(), options(500));

    pipeline.edit(schema).unwrap();
    let snapshot = pipeline.settled().await.unwrap();

    let error = snapshot.error.unwrap();
    assert_eq!(error.message, "near \"INTEGR\": syntax error");
    assert_eq!(error.seq, 1);
    let location = error.location.unwrap();
    assert_eq!(location.line_number(), 2);
    assert_eq!(location.column_number(), 6);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_edits_during_apply_never_overlap() {
    let engine = ScriptedEngine::new();
    engine.delay_on("slow", Duration::from_secs(2));
    let pipeline = SchemaPipeline::spawn(engine.clone(), options(500));

    pipeline.edit("slow").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(matches!(
        pipeline.snapshot().state,
        SchemaState::Applying { seq: 1 }
    ));

    // Debounce of the second edit elapses while the first apply still runs.
    pipeline.edit("fast").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(engine.applied(), vec!["slow".to_string()]);
    assert_eq!(pipeline.snapshot().pending, Some(2));

    let snapshot = pipeline.settled().await.unwrap();
    assert_eq!(engine.applied(), vec!["slow".to_string(), "fast".to_string()]);
    assert_eq!(engine.max_concurrent_applies(), 1);
    assert_eq!(snapshot.refresh_generation, 2);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_script_teardown_runs_before_schema() {
    let engine = ScriptedEngine::new();
    let teardown = "DROP TABLE IF EXISTS users; DROP TABLE IF EXISTS posts;";
    let pipeline = SchemaPipeline::spawn(
        engine.clone(),
        PipelineOptions {
            teardown: TeardownPolicy::Script {
                sql: teardown.to_string(),
            },
            ..options(500)
        },
    );

    pipeline.edit("CREATE TABLE users (id INTEGER);").unwrap();
    pipeline.settled().await.unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            Call::Apply(teardown.to_string()),
            Call::Apply("CREATE TABLE users (id INTEGER);".to_string()),
        ]
    );

    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_error_persists_until_next_apply_settles() {
    let engine = ScriptedEngine::new();
    engine.fail_on("bad", "near \"bad\": syntax error");
    let pipeline = SchemaPipeline::spawn(engine.clone(), options(500));

    pipeline.edit("bad").unwrap();
    assert!(pipeline.settled().await.unwrap().error.is_some());

    pipeline.edit("good").unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(pipeline.snapshot().error.is_some());

    let snapshot = pipeline.settled().await.unwrap();
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.refresh_generation, 1);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_clear_error_on_edit() {
    let engine = ScriptedEngine::new();
    engine.fail_on("bad", "near \"bad\": syntax error");
    let pipeline = SchemaPipeline::spawn(
        engine.clone(),
        PipelineOptions {
            clear_error_on_edit: true,
            ..options(500)
        },
    );

    pipeline.edit("bad").unwrap();
    assert!(pipeline.settled().await.unwrap().error.is_some());

    pipeline.edit("still bad").unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(pipeline.snapshot().error.is_none());

    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drops_scheduled_apply() {
    let engine = ScriptedEngine::new();
    let pipeline = SchemaPipeline::spawn(engine.clone(), options(500));

    pipeline.edit("CREATE TABLE t (id INTEGER);").unwrap();
    pipeline.shutdown().await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(engine.calls().is_empty());
}
