//! In-memory SQLite engine
//!
//! `SqliteEngine` owns a private in-memory database for one session. All
//! access goes through a `Mutex` because `rusqlite::Connection` is not `Sync`.
//! Calls are short and never hold the lock across an await point.

use async_trait::async_trait;
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::{Batch, Connection};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{ColumnInfo, EngineAdapter, TableInfo};
use crate::error::{Error, Result};
use crate::model::{Row, RowSet, Value};

/// SQLite-backed engine adapter
pub struct SqliteEngine {
    conn: Mutex<Connection>,
    /// Wrap every `apply` in a transaction so a failing statement rolls back
    /// the statements before it.
    atomic_apply: bool,
}

impl SqliteEngine {
    /// Open a fresh in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        debug!("SQLite engine opened (in-memory)");
        Ok(Self {
            conn: Mutex::new(conn),
            atomic_apply: true,
        })
    }

    /// Enable or disable transactional applies.
    ///
    /// Scripts that issue their own BEGIN/COMMIT need this turned off.
    pub fn with_atomic_apply(mut self, atomic: bool) -> Self {
        self.atomic_apply = atomic;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("engine connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl EngineAdapter for SqliteEngine {
    async fn apply(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        if self.atomic_apply {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(sql)?;
            tx.commit()?;
        } else {
            conn.execute_batch(sql)?;
        }
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<RowSet> {
        let conn = self.lock()?;
        run_batch(&conn, sql)
    }

    async fn reset(&self) -> Result<()> {
        let conn = self.lock()?;
        let objects = user_objects(&conn)?;
        if objects.is_empty() {
            return Ok(());
        }

        let mut script = String::new();
        for (kind, name) in &objects {
            script.push_str(&format!(
                "DROP {} IF EXISTS {};\n",
                kind.to_uppercase(),
                quote_ident(name)
            ));
        }
        debug!(objects = objects.len(), "Dropping user objects");

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(&script)?;
        tx.commit()?;
        Ok(())
    }

    async fn tables(&self) -> Result<Vec<TableInfo>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY rowid",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut col_stmt = conn.prepare(
            "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = col_stmt
                .query_map([&name], |row| {
                    Ok(ColumnInfo {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                        not_null: row.get::<_, i64>(2)? != 0,
                        primary_key: row.get::<_, i64>(3)? != 0,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            tables.push(TableInfo { name, columns });
        }

        Ok(tables)
    }
}

/// Run every statement of `sql` in order and keep the rows of the last
/// statement that has a result set.
fn run_batch(conn: &Connection, sql: &str) -> Result<RowSet> {
    let mut batch = Batch::new(conn, sql);
    let mut last: Option<RowSet> = None;

    while let Some(mut stmt) = batch.next()? {
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([])?;
        let mut collected = RowSet::new();
        while let Some(row) = rows.next()? {
            let mut out = Row::new();
            for (idx, name) in names.iter().enumerate() {
                out.push(name.as_str(), Value::from(row.get_ref(idx)?));
            }
            collected.push(out);
        }

        if !names.is_empty() {
            last = Some(collected);
        }
    }

    Ok(last.unwrap_or_default())
}

/// User-defined triggers, views and tables, in the order they must be dropped
fn user_objects(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT type, name FROM sqlite_master \
         WHERE type IN ('trigger', 'view', 'table') AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
         ORDER BY CASE type WHEN 'trigger' THEN 0 WHEN 'view' THEN 1 ELSE 2 END, rowid DESC",
    )?;
    let objects = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(objects)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
