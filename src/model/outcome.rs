//! Outcomes of schema applies and query runs

use serde::Serialize;
use std::fmt;

use super::document::SourceDocument;
use super::row::{Row, RowSet};

/// A 1-based position inside the source document that produced an error.
///
/// Only the location resolver creates these, so a location always points
/// inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorLocation {
    line_number: usize,
    column_number: usize,
}

impl ErrorLocation {
    pub(crate) fn new(line_number: usize, column_number: usize) -> Self {
        debug_assert!(line_number >= 1 && column_number >= 1);
        Self {
            line_number,
            column_number,
        }
    }

    /// 1-based line
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// 1-based column, counted in characters
    pub fn column_number(&self) -> usize {
        self.column_number
    }

    /// End column of the inline annotation: one past the last character of
    /// the annotated line.
    pub fn span_end(&self, source: &SourceDocument) -> usize {
        source
            .line(self.line_number)
            .map(|line| line.chars().count() + 1)
            .unwrap_or(self.column_number)
            .max(self.column_number)
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line_number, self.column_number)
    }
}

/// Result of one apply or query attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success {
        rows: RowSet,
        /// Wall-clock time around the engine call, in milliseconds
        elapsed_ms: f64,
    },
    Failure {
        message: String,
        location: Option<ErrorLocation>,
    },
}

impl ExecutionOutcome {
    /// Check if the attempt succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    /// Rows of a successful outcome
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            ExecutionOutcome::Success { rows, .. } => Some(rows),
            ExecutionOutcome::Failure { .. } => None,
        }
    }

    /// Row count of a successful outcome
    pub fn row_count(&self) -> Option<usize> {
        self.rows().map(<[Row]>::len)
    }

    /// Elapsed time of a successful outcome
    pub fn elapsed_ms(&self) -> Option<f64> {
        match self {
            ExecutionOutcome::Success { elapsed_ms, .. } => Some(*elapsed_ms),
            ExecutionOutcome::Failure { .. } => None,
        }
    }

    /// Error message of a failed outcome
    pub fn message(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Failure { message, .. } => Some(message),
            ExecutionOutcome::Success { .. } => None,
        }
    }

    /// Error location of a failed outcome, when one was resolved
    pub fn location(&self) -> Option<ErrorLocation> {
        match self {
            ExecutionOutcome::Failure { location, .. } => *location,
            ExecutionOutcome::Success { .. } => None,
        }
    }
}

/// Standing error of the schema slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaApplyError {
    /// Engine message, verbatim
    pub message: String,
    /// Where the error points in the applied schema text
    pub location: Option<ErrorLocation>,
    /// Sequence number of the apply that failed
    pub seq: u64,
    /// The schema text that was applied; `location` indexes into it
    #[serde(skip)]
    pub source: SourceDocument,
}

impl SchemaApplyError {
    /// The source line the location points at
    pub fn located_line(&self) -> Option<&str> {
        self.location
            .and_then(|location| self.source.line(location.line_number()))
    }
}

impl fmt::Display for SchemaApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({})", self.message, location),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Standing error of the query slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryExecutionError {
    /// Engine message, verbatim
    pub message: String,
    /// Generation token of the run that failed
    pub token: u64,
}

impl fmt::Display for QueryExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
