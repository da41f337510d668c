//! Schema browser
//!
//! Lists the tables of the live database and previews one of them. The
//! listing is reloaded whenever the schema pipeline reports a new successful
//! apply (a new refresh generation).

use serde::Serialize;
use tracing::debug;

use crate::engine::{SharedEngine, TableInfo};
use crate::error::{Error, Result};
use crate::model::RowSet;

/// What the browser currently shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BrowserView {
    /// Tables in creation order
    pub tables: Vec<TableInfo>,
    /// Table being previewed
    pub selected: Option<String>,
    /// First rows of the selected table
    pub preview: RowSet,
    /// Refresh generation this view was loaded for
    pub generation: u64,
}

/// Table listing and preview, refreshed on schema changes
pub struct SchemaBrowser {
    engine: SharedEngine,
    preview_limit: usize,
    view: BrowserView,
    loaded: bool,
}

impl SchemaBrowser {
    /// Create a browser that has not loaded anything yet
    pub fn new(engine: SharedEngine, preview_limit: usize) -> Self {
        Self {
            engine,
            preview_limit,
            view: BrowserView::default(),
            loaded: false,
        }
    }

    /// Reload the listing if `generation` differs from the loaded one.
    ///
    /// Returns whether a reload happened. The selected table is kept when it
    /// still exists, otherwise the first table is selected.
    pub async fn refresh(&mut self, generation: u64) -> Result<bool> {
        if self.loaded && self.view.generation == generation {
            return Ok(false);
        }

        let tables = self.engine.tables().await?;
        let selected = self
            .view
            .selected
            .take()
            .filter(|name| tables.iter().any(|t| &t.name == name))
            .or_else(|| tables.first().map(|t| t.name.clone()));

        let preview = match &selected {
            Some(name) => self.load_preview(name).await?,
            None => RowSet::new(),
        };
        debug!(generation, tables = tables.len(), "Schema browser refreshed");

        self.view = BrowserView {
            tables,
            selected,
            preview,
            generation,
        };
        self.loaded = true;
        Ok(true)
    }

    /// Preview another table
    pub async fn select(&mut self, name: &str) -> Result<()> {
        if !self.view.tables.iter().any(|t| t.name == name) {
            return Err(Error::TableNotFound(name.to_string()));
        }
        self.view.preview = self.load_preview(name).await?;
        self.view.selected = Some(name.to_string());
        Ok(())
    }

    /// Current view
    pub fn view(&self) -> &BrowserView {
        &self.view
    }

    async fn load_preview(&self, name: &str) -> Result<RowSet> {
        let sql = format!(
            "SELECT * FROM \"{}\" LIMIT {}",
            name.replace('"', "\"\""),
            self.preview_limit
        );
        self.engine.query(&sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineAdapter, SqliteEngine};
    use std::sync::Arc;

    async fn engine_with(schema: &str) -> SharedEngine {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine.apply(schema).await.unwrap();
        Arc::new(engine)
    }

    #[tokio::test]
    async fn test_refresh_selects_first_table() {
        let engine = engine_with(
            "CREATE TABLE users (id INTEGER, name TEXT);\n\
             CREATE TABLE posts (id INTEGER);\n\
             INSERT INTO users VALUES (1, 'a'), (2, 'b'), (3, 'c');",
        )
        .await;
        let mut browser = SchemaBrowser::new(engine, 2);

        assert!(browser.refresh(1).await.unwrap());
        let view = browser.view();
        assert_eq!(view.tables.len(), 2);
        assert_eq!(view.selected.as_deref(), Some("users"));
        assert_eq!(view.preview.len(), 2);

        // Same generation: nothing to do.
        assert!(!browser.refresh(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_select_and_keep_selection() {
        let engine = engine_with(
            "CREATE TABLE users (id INTEGER);\nCREATE TABLE posts (id INTEGER);",
        )
        .await;
        let mut browser = SchemaBrowser::new(engine.clone(), 100);
        browser.refresh(1).await.unwrap();

        browser.select("posts").await.unwrap();
        assert_eq!(browser.view().selected.as_deref(), Some("posts"));

        browser.refresh(2).await.unwrap();
        assert_eq!(browser.view().selected.as_deref(), Some("posts"));

        engine.apply("DROP TABLE posts;").await.unwrap();
        browser.refresh(3).await.unwrap();
        assert_eq!(browser.view().selected.as_deref(), Some("users"));
    }

    #[tokio::test]
    async fn test_select_unknown_table() {
        let engine = engine_with("CREATE TABLE users (id INTEGER);").await;
        let mut browser = SchemaBrowser::new(engine, 100);
        browser.refresh(1).await.unwrap();

        let err = browser.select("nope").await.unwrap_err();
        assert!(matches!(err, Error::TableNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_empty_database() {
        let engine: SharedEngine = Arc::new(SqliteEngine::open_in_memory().unwrap());
        let mut browser = SchemaBrowser::new(engine, 100);
        browser.refresh(0).await.unwrap();
        assert!(browser.view().tables.is_empty());
        assert_eq!(browser.view().selected, None);
    }
}
