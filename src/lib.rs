//! SqlPad - a live schema and query playground over an embedded SQL engine
//!
//! This library provides the mediation layer between editor text and the
//! database engine:
//! - Debounced, strictly sequential schema application
//! - Engine error to source location resolution
//! - Query execution with selection, timing and row counts
//! - Result export (CSV, ASCII tables) and a schema browser
//! - A schema file watcher for editing in an external editor

pub mod browser;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod query;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod watcher;

pub use config::PlaygroundConfig;
pub use engine::{EngineAdapter, SharedEngine, SqliteEngine};
pub use error::{Error, Result};
pub use session::Session;
