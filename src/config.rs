//! Configuration for SqlPad
//!
//! A session is configured through [`PlaygroundConfig`], built either with
//! the builder-style setters or loaded from a JSON file. Missing fields take
//! their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default debounce delay for schema edits
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Default row limit of the table preview
pub const DEFAULT_PREVIEW_LIMIT: usize = 100;

/// Default CSV export file name
pub const DEFAULT_EXPORT_PATH: &str = "query_result.csv";

/// Schema a new session starts from
pub const SAMPLE_SCHEMA: &str = "CREATE TABLE users (
  id INTEGER PRIMARY KEY,
  username VARCHAR(50),
  role VARCHAR(50)
);

CREATE TABLE posts (
  id INTEGER PRIMARY KEY,
  title VARCHAR(50),
  body TEXT,
  user_id INTEGER,
  status VARCHAR(50)
);

INSERT INTO users (id, username, role) VALUES
  (1, 'rauch.acho', 'Admin'),
  (2, 'amira.benali', 'Editor'),
  (3, 'yanis.haddad', 'Viewer'),
  (4, 'sofia.mendes', 'Editor'),
  (5, 'leo.durand', 'Viewer'),
  (6, 'nina.bousquet', 'Admin'),
  (7, 'mehdi.kassimi', 'Viewer'),
  (8, 'claire.joubert', 'Editor'),
  (9, 'ilyes.hamzaoui', 'Viewer'),
  (10, 'eva.laurent', 'Admin');
";

/// Query buffer a new session starts from
pub const SAMPLE_QUERY: &str = "SELECT * FROM users;";

/// How the previous schema is torn down before a new one is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TeardownPolicy {
    /// Drop every user-defined object through the engine's reset
    #[default]
    DropAll,
    /// Run a fixed teardown script
    Script { sql: String },
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Quiet period after the last schema edit before it is applied
    pub debounce_ms: u64,
    /// Teardown step run before every schema apply
    pub teardown: TeardownPolicy,
    /// Schema text the session starts with
    pub initial_schema: String,
    /// Query buffer the session starts with
    pub initial_query: String,
    /// Row limit of the table preview
    pub preview_limit: usize,
    /// Clear a standing schema error as soon as the schema is edited again
    pub clear_error_on_edit: bool,
    /// Default log filter (overridden by RUST_LOG)
    pub log_level: String,
    /// Where CSV exports are written by default
    pub export_path: PathBuf,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            teardown: TeardownPolicy::default(),
            initial_schema: SAMPLE_SCHEMA.to_string(),
            initial_query: SAMPLE_QUERY.to_string(),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            clear_error_on_edit: false,
            log_level: "info".to_string(),
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
        }
    }
}

impl PlaygroundConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse a config from JSON text and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the debounce delay in milliseconds
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the teardown policy
    pub fn teardown(mut self, teardown: TeardownPolicy) -> Self {
        self.teardown = teardown;
        self
    }

    /// Set the initial schema text
    pub fn initial_schema(mut self, schema: impl Into<String>) -> Self {
        self.initial_schema = schema.into();
        self
    }

    /// Set the initial query buffer
    pub fn initial_query(mut self, query: impl Into<String>) -> Self {
        self.initial_query = query.into();
        self
    }

    /// Set the preview row limit
    pub fn preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    /// Clear the schema error on every edit
    pub fn clear_error_on_edit(mut self, clear: bool) -> Self {
        self.clear_error_on_edit = clear;
        self
    }

    /// Get the debounce delay as a `Duration`
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(Error::Config(
                "debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.preview_limit == 0 {
            return Err(Error::Config(
                "preview_limit must be greater than zero".to_string(),
            ));
        }
        if let TeardownPolicy::Script { sql } = &self.teardown {
            if sql.trim().is_empty() {
                return Err(Error::Config("teardown script is empty".to_string()));
            }
        }
        Ok(())
    }
}
