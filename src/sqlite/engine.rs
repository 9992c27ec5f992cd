//! Query engine
//!
//! The `QueryEngine` is the top-level orchestrator: it extracts the resource
//! tables a query references, materializes each of them into the relational
//! cache, then runs the query and returns the full result set. It owns the
//! process's single SQLite session behind a `Mutex` (`rusqlite::Connection`
//! is not `Sync`) and hands it explicitly to the attach/refresh paths; the
//! main database is in-memory and all persistent state lives in the attached
//! per-region files.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineOptions;
use crate::error::{CloudqError, Result};
use crate::parser::{self, TableReference};
use crate::provider::CloudProvider;
use crate::region::Region;

use super::loader::{self, AlwaysStale, FreshnessPolicy, TtlFreshness};
use super::{functions, regions};

/// Result of a SQL query execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Row data -- each row is a vector of nullable string values.
    pub rows: Vec<QueryRow>,
    /// Total number of rows returned.
    pub row_count: usize,
    /// Wall-clock execution time in milliseconds.
    pub execution_ms: u64,
}

/// A single result row represented as a vector of nullable string cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRow {
    pub values: Vec<Option<String>>,
}

/// The query engine over one cloud provider session.
pub struct QueryEngine {
    conn: Mutex<Connection>,
    provider: Arc<dyn CloudProvider>,
    options: EngineOptions,
    freshness: Box<dyn FreshnessPolicy>,
    /// (region schema, table name) -> when this process last refreshed it.
    loaded_at: Mutex<HashMap<(String, String), Instant>>,
    home_region: Region,
}

impl QueryEngine {
    /// Create an engine: open the session, register `json_get`, and attach
    /// the provider's default region.
    pub fn new(provider: Arc<dyn CloudProvider>, options: EngineOptions) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CloudqError::storage("open session", e.to_string()))?;
        functions::register(&conn)?;

        let home_region = provider.default_region();
        regions::attach_region(&conn, &options.data_dir, &home_region)?;

        let freshness: Box<dyn FreshnessPolicy> = match options.table_ttl {
            Some(ttl) => Box::new(TtlFreshness::new(ttl)),
            None => Box::new(AlwaysStale),
        };

        info!(
            region = %home_region,
            data_dir = %options.data_dir.display(),
            "Query engine initialized"
        );
        Ok(Self {
            conn: Mutex::new(conn),
            provider,
            options,
            freshness,
            loaded_at: Mutex::new(HashMap::new()),
            home_region,
        })
    }

    /// Replace the freshness policy (the options-derived one by default).
    pub fn with_freshness(mut self, policy: Box<dyn FreshnessPolicy>) -> Self {
        self.freshness = policy;
        self
    }

    /// The region unqualified table references resolve to.
    pub fn home_region(&self) -> &Region {
        &self.home_region
    }

    /// Region schemas currently attached to the session.
    pub fn attached_regions(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        Ok(regions::attached_schemas(&conn)?
            .into_iter()
            .filter(|name| name != "main" && name != "temp")
            .collect())
    }

    /// Execute a query: load every referenced resource table, then run the
    /// SQL and materialize the full result set.
    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        info!(query = sql, "Executing query");

        let tables = parser::table_references(sql)?;
        let conn = self.conn.lock();
        for table in &tables {
            self.load_table(&conn, table)?;
        }
        run_query(&conn, sql, start)
    }

    /// Materialize one table reference into its region's schema.
    fn load_table(&self, conn: &Connection, table: &TableReference) -> Result<()> {
        let region = table
            .database
            .as_deref()
            .map(Region::new)
            .unwrap_or_else(|| self.home_region.clone());
        let (kind, collection_name) = table.split()?;

        let handle = self.provider.resource(kind, &region)?;
        let collection = handle
            .collection(collection_name)
            .ok_or_else(|| CloudqError::unknown_collection(kind, collection_name))?;

        regions::attach_region(conn, &self.options.data_dir, &region)?;

        let key = (region.schema_name().to_string(), table.table.clone());
        let last_refresh = self.loaded_at.lock().get(&key).copied();
        if self.freshness.is_fresh(last_refresh) {
            debug!(region = %region, table = %table.table, "Table still fresh, skipping reload");
            return Ok(());
        }

        loader::refresh_table(
            conn,
            &region,
            &table.table,
            handle.service_model(),
            collection.as_ref(),
        )?;
        self.loaded_at.lock().insert(key, Instant::now());
        Ok(())
    }
}

/// Run the SQL against the session and collect columns plus all rows.
fn run_query(conn: &Connection, sql: &str, start: Instant) -> Result<QueryResult> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| CloudqError::query(e.to_string()))?;

    let column_count = stmt.column_count();
    let columns: Vec<String> = (0..column_count)
        .map(|i| stmt.column_name(i).unwrap_or("?").to_string())
        .collect();

    let rows_iter = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value: Option<String> = match row.get_ref(i) {
                    Ok(rusqlite::types::ValueRef::Null) => None,
                    Ok(rusqlite::types::ValueRef::Integer(n)) => Some(n.to_string()),
                    Ok(rusqlite::types::ValueRef::Real(f)) => Some(f.to_string()),
                    Ok(rusqlite::types::ValueRef::Text(s)) => {
                        Some(String::from_utf8_lossy(s).to_string())
                    }
                    Ok(rusqlite::types::ValueRef::Blob(b)) => {
                        Some(String::from_utf8_lossy(b).to_string())
                    }
                    Err(_) => None,
                };
                values.push(value);
            }
            Ok(QueryRow { values })
        })
        .map_err(|e| CloudqError::query(e.to_string()))?;

    let mut rows = Vec::new();
    for row in rows_iter {
        rows.push(row.map_err(|e| CloudqError::query(e.to_string()))?);
    }

    let row_count = rows.len();
    let execution_ms = start.elapsed().as_millis() as u64;
    debug!(rows = row_count, elapsed_ms = execution_ms, "Query finished");

    Ok(QueryResult {
        columns,
        rows,
        row_count,
        execution_ms,
    })
}
