//! Engine adapter module
//!
//! The core never talks to a database directly. It goes through
//! [`EngineAdapter`], which accepts raw SQL text and either succeeds or fails
//! with the engine's own message. [`SqliteEngine`] is the bundled in-memory
//! implementation.

pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::model::RowSet;

pub use sqlite::SqliteEngine;

/// Execute/query interface of an embedded database
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Execute (possibly multi-statement) SQL for its side effects
    async fn apply(&self, sql: &str) -> Result<()>;

    /// Execute SQL and return the rows it produced
    async fn query(&self, sql: &str) -> Result<RowSet>;

    /// Drop every user-defined object, leaving an empty database
    async fn reset(&self) -> Result<()>;

    /// List user tables with their columns, in creation order
    async fn tables(&self) -> Result<Vec<TableInfo>>;
}

/// Engine handle shared by the pipeline, the orchestrator and the browser
pub type SharedEngine = Arc<dyn EngineAdapter>;

/// A user table known to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Declared type (may be empty)
    pub data_type: String,
    /// Whether the column is declared NOT NULL
    pub not_null: bool,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table: {}", self.name)?;
        for col in &self.columns {
            write!(f, "  {}", col.name)?;
            if !col.data_type.is_empty() {
                write!(f, " {}", col.data_type)?;
            }
            if col.primary_key {
                write!(f, " PRIMARY KEY")?;
            }
            if col.not_null {
                write!(f, " NOT NULL")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
