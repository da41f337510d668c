//! Data model module
//!
//! This module contains the values shared between the core components and
//! their collaborators: documents, selections, rows and outcomes.

pub mod document;
pub mod outcome;
pub mod row;
pub mod value;

pub use document::{SelectionScope, SourceDocument};
pub use outcome::{ErrorLocation, ExecutionOutcome, QueryExecutionError, SchemaApplyError};
pub use row::{Row, RowSet};
pub use value::Value;
