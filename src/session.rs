//! Playground session
//!
//! Wires one engine to the schema pipeline, the query orchestrator and the
//! schema browser. The schema and query error slots are kept apart: each is
//! only ever replaced by another attempt of its own kind.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::browser::{BrowserView, SchemaBrowser};
use crate::config::PlaygroundConfig;
use crate::engine::{SharedEngine, SqliteEngine};
use crate::error::Result;
use crate::export;
use crate::model::{QueryExecutionError, SchemaApplyError, SelectionScope, SourceDocument};
use crate::query::{QueryOrchestrator, QueryRun};
use crate::schema::{PipelineOptions, SchemaPipeline, SchemaSnapshot};

/// A live schema/query playground over one engine
pub struct Session {
    config: PlaygroundConfig,
    schema: SchemaPipeline,
    queries: QueryOrchestrator,
    browser: Mutex<SchemaBrowser>,
    schema_text: std::sync::Mutex<SourceDocument>,
}

impl Session {
    /// Start a session over a fresh in-memory SQLite database.
    ///
    /// The configured initial schema is submitted as the first edit.
    pub fn start(config: PlaygroundConfig) -> Result<Self> {
        let engine: SharedEngine = Arc::new(SqliteEngine::open_in_memory()?);
        Self::with_engine(config, engine)
    }

    /// Start a session over any engine adapter
    pub fn with_engine(config: PlaygroundConfig, engine: SharedEngine) -> Result<Self> {
        config.validate()?;

        let schema = SchemaPipeline::spawn(engine.clone(), PipelineOptions::from(&config));
        let queries = QueryOrchestrator::new(engine.clone());
        let browser = SchemaBrowser::new(engine, config.preview_limit);

        let session = Self {
            schema_text: std::sync::Mutex::new(SourceDocument::default()),
            config,
            schema,
            queries,
            browser: Mutex::new(browser),
        };
        if !session.config.initial_schema.is_empty() {
            let initial = session.config.initial_schema.clone();
            session.edit_schema(initial)?;
        }
        info!("Session started");
        Ok(session)
    }

    /// Session configuration
    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    // ========== Schema ==========

    /// The schema editor changed
    pub fn edit_schema(&self, text: impl Into<SourceDocument>) -> Result<u64> {
        let document = text.into();
        let seq = self.schema.edit(document.clone())?;
        *self
            .schema_text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = document;
        Ok(seq)
    }

    /// The latest schema text submitted
    pub fn schema_text(&self) -> SourceDocument {
        self.schema_text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Latest pipeline snapshot
    pub fn schema_status(&self) -> SchemaSnapshot {
        self.schema.snapshot()
    }

    /// The standing schema error
    pub fn schema_error(&self) -> Option<SchemaApplyError> {
        self.schema.snapshot().error
    }

    /// Wait for all submitted schema edits to settle
    pub async fn wait_for_schema(&self) -> Result<SchemaSnapshot> {
        self.schema.settled().await
    }

    /// Subscribe to pipeline snapshots
    pub fn subscribe_schema(&self) -> tokio::sync::watch::Receiver<SchemaSnapshot> {
        self.schema.subscribe()
    }

    // ========== Queries ==========

    /// Run the query buffer, or the selection when one is set
    pub async fn run_query(&self, buffer: &str, selection: &SelectionScope) -> QueryRun {
        self.queries.run_query(buffer, selection).await
    }

    /// The standing query error
    pub fn query_error(&self) -> Option<QueryExecutionError> {
        self.queries.last_error()
    }

    /// The query orchestrator
    pub fn queries(&self) -> &QueryOrchestrator {
        &self.queries
    }

    /// Export the visible query result as CSV. Returns `false` when there is
    /// nothing to export.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<bool> {
        export::export_csv_to_file(&self.queries.visible_rows(), path)
    }

    // ========== Browser ==========

    /// The table listing, reloaded if the schema changed since the last call
    pub async fn browse(&self) -> Result<BrowserView> {
        let generation = self.schema.snapshot().refresh_generation;
        let mut browser = self.browser.lock().await;
        browser.refresh(generation).await?;
        Ok(browser.view().clone())
    }

    /// Preview a table
    pub async fn preview(&self, table: &str) -> Result<BrowserView> {
        let generation = self.schema.snapshot().refresh_generation;
        let mut browser = self.browser.lock().await;
        browser.refresh(generation).await?;
        browser.select(table).await?;
        Ok(browser.view().clone())
    }

    /// Stop applying schema edits. Later edits fail with `PipelineClosed`.
    pub fn close_schema(&self) {
        self.schema.close();
    }

    /// Stop the schema pipeline
    pub async fn shutdown(self) -> Result<()> {
        self.schema.shutdown().await
    }
}
