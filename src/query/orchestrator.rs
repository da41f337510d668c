//! Query execution orchestrator
//!
//! Runs the query buffer (or the selected part of it) on explicit request.
//! Runs are not serialized. Each one is issued a generation token when it
//! starts, and only the run holding the most recently issued token may update
//! the visible outcome; older runs still report back to their caller.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::SharedEngine;
use crate::model::{ExecutionOutcome, QueryExecutionError, Row, SelectionScope};

/// Message of a run that had nothing to execute
pub const EMPTY_QUERY_MESSAGE: &str = "no SQL to execute";

/// Report of one run, handed back to the caller that triggered it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRun {
    /// Generation token of the run
    pub token: u64,
    /// The exact text sent to the engine
    pub executed_sql: String,
    pub outcome: ExecutionOutcome,
    /// A newer run was issued before this one settled
    pub superseded: bool,
}

impl QueryRun {
    /// Row count of a successful run
    pub fn row_count(&self) -> Option<usize> {
        self.outcome.row_count()
    }
}

#[derive(Debug, Default)]
struct Visible {
    token: u64,
    outcome: Option<ExecutionOutcome>,
    error: Option<QueryExecutionError>,
}

/// Query execution orchestrator
pub struct QueryOrchestrator {
    engine: SharedEngine,
    issued: AtomicU64,
    in_flight: AtomicUsize,
    visible: Mutex<Visible>,
}

/// Keeps the loading flag raised while a run is outstanding, including when
/// the run's future is dropped early.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn raise(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl QueryOrchestrator {
    /// Create an orchestrator over `engine`
    pub fn new(engine: SharedEngine) -> Self {
        Self {
            engine,
            issued: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            visible: Mutex::new(Visible::default()),
        }
    }

    /// Run `selection` (or the whole `buffer`) against the engine.
    ///
    /// Never fails: engine errors come back as a `Failure` outcome.
    pub async fn run_query(&self, buffer: &str, selection: &SelectionScope) -> QueryRun {
        let token = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let sql = selection.resolve(buffer).to_string();
        debug!(token, selection = selection.is_range(), "Running query");

        let outcome = if sql.trim().is_empty() {
            ExecutionOutcome::Failure {
                message: EMPTY_QUERY_MESSAGE.to_string(),
                location: None,
            }
        } else {
            let _loading = LoadingGuard::raise(&self.in_flight);
            let started = Instant::now();
            let result = self.engine.query(&sql).await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok(rows) => {
                    info!(token, rows = rows.len(), elapsed_ms, "Query executed");
                    ExecutionOutcome::Success { rows, elapsed_ms }
                }
                Err(e) => {
                    warn!(token, error = %e, "Query failed");
                    ExecutionOutcome::Failure {
                        message: e.message(),
                        location: None,
                    }
                }
            }
        };

        let superseded = !self.settle(token, &outcome);
        QueryRun {
            token,
            executed_sql: sql,
            outcome,
            superseded,
        }
    }

    /// Publish `outcome` if `token` is still the most recently issued one
    fn settle(&self, token: u64, outcome: &ExecutionOutcome) -> bool {
        let mut visible = self.lock_visible();
        if token != self.issued.load(Ordering::SeqCst) {
            debug!(token, "Discarding superseded query result");
            return false;
        }

        visible.token = token;
        visible.error = match outcome {
            ExecutionOutcome::Success { .. } => None,
            ExecutionOutcome::Failure { message, .. } => Some(QueryExecutionError {
                message: message.clone(),
                token,
            }),
        };
        visible.outcome = Some(outcome.clone());
        true
    }

    fn lock_visible(&self) -> MutexGuard<'_, Visible> {
        // The guarded data is plain values, so a poisoned lock is still usable.
        self.visible
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether any run is outstanding
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// The visible outcome
    pub fn last_outcome(&self) -> Option<ExecutionOutcome> {
        self.lock_visible().outcome.clone()
    }

    /// Token of the run that produced the visible outcome (0 before any run)
    pub fn visible_token(&self) -> u64 {
        self.lock_visible().token
    }

    /// Rows for display: the visible successful result, or nothing
    pub fn visible_rows(&self) -> Vec<Row> {
        self.lock_visible()
            .outcome
            .as_ref()
            .and_then(|o| o.rows())
            .map(<[Row]>::to_vec)
            .unwrap_or_default()
    }

    /// The standing query error
    pub fn last_error(&self) -> Option<QueryExecutionError> {
        self.lock_visible().error.clone()
    }
}
