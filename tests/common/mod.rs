//! Shared test helpers
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlpad::engine::{EngineAdapter, TableInfo};
use sqlpad::model::{Row, RowSet, Value};
use sqlpad::{Error, Result};

/// One call received by a [`ScriptedEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Apply(String),
    Query(String),
    Reset,
    Tables,
}

/// Engine double with scripted failures and delays.
///
/// Queries return `rows` rows of `(id, name)`; the row count comes from the
/// per-SQL script or defaults to 1.
#[derive(Default)]
pub struct ScriptedEngine {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<String, String>>,
    delays: Mutex<HashMap<String, Duration>>,
    row_counts: Mutex<HashMap<String, usize>>,
    reset_failure: Mutex<Option<String>>,
    active_applies: AtomicUsize,
    max_active_applies: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `sql` fail with `message` (apply or query)
    pub fn fail_on(&self, sql: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(sql.to_string(), message.to_string());
    }

    /// Make `reset` fail with `message`
    pub fn fail_reset(&self, message: &str) {
        *self.reset_failure.lock().unwrap() = Some(message.to_string());
    }

    /// Delay calls carrying `sql`
    pub fn delay_on(&self, sql: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(sql.to_string(), delay);
    }

    /// Number of rows a query of `sql` returns
    pub fn rows_for(&self, sql: &str, count: usize) {
        self.row_counts.lock().unwrap().insert(sql.to_string(), count);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// SQL of every apply call, in order
    pub fn applied(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Apply(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    /// Highest number of applies that ever ran at once
    pub fn max_concurrent_applies(&self) -> usize {
        self.max_active_applies.load(Ordering::SeqCst)
    }

    async fn pause(&self, sql: &str) {
        let delay = self.delays.lock().unwrap().get(sql).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn failure(&self, sql: &str) -> Option<String> {
        self.failures.lock().unwrap().get(sql).cloned()
    }
}

#[async_trait]
impl EngineAdapter for ScriptedEngine {
    async fn apply(&self, sql: &str) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Apply(sql.to_string()));
        let active = self.active_applies.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_applies.fetch_max(active, Ordering::SeqCst);

        self.pause(sql).await;

        self.active_applies.fetch_sub(1, Ordering::SeqCst);
        match self.failure(sql) {
            Some(message) => Err(Error::Engine(message)),
            None => Ok(()),
        }
    }

    async fn query(&self, sql: &str) -> Result<RowSet> {
        self.calls.lock().unwrap().push(Call::Query(sql.to_string()));
        self.pause(sql).await;

        if let Some(message) = self.failure(sql) {
            return Err(Error::Engine(message));
        }
        let count = self.row_counts.lock().unwrap().get(sql).copied().unwrap_or(1);
        Ok((1..=count as i64)
            .map(|id| {
                Row::from_pairs([
                    ("id", Value::Integer(id)),
                    ("name", Value::Text(format!("row {}", id))),
                ])
            })
            .collect())
    }

    async fn reset(&self) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Reset);
        match self.reset_failure.lock().unwrap().clone() {
            Some(message) => Err(Error::Engine(message)),
            None => Ok(()),
        }
    }

    async fn tables(&self) -> Result<Vec<TableInfo>> {
        self.calls.lock().unwrap().push(Call::Tables);
        Ok(Vec::new())
    }
}
