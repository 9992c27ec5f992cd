//! Table refresh
//!
//! Replacing a cached table is the only writer path in the system. The drop,
//! create and bulk insert all happen inside one transaction, so a reader sees
//! either the previous snapshot or the fully loaded new one, never a
//! half-populated table. The column set is recomputed from the metadata model
//! on every refresh; a changed provider model recreates the table rather than
//! patching it.

use std::time::{Duration, Instant};

use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CloudqError, Result};
use crate::provider::{normalize_tags, Fields, ResourceCollection, ServiceModel};
use crate::region::Region;

use super::schema;

/// Decides whether a cached table can be served without reloading.
///
/// Injected into the engine; the baseline is [`AlwaysStale`].
pub trait FreshnessPolicy: Send + Sync {
    /// `last_refresh` is `None` when the table was never loaded by this
    /// process.
    fn is_fresh(&self, last_refresh: Option<Instant>) -> bool;
}

/// Baseline policy: every query reloads the tables it references.
pub struct AlwaysStale;

impl FreshnessPolicy for AlwaysStale {
    fn is_fresh(&self, _last_refresh: Option<Instant>) -> bool {
        false
    }
}

/// Tables stay fresh for a fixed window after loading.
pub struct TtlFreshness {
    ttl: Duration,
}

impl TtlFreshness {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl FreshnessPolicy for TtlFreshness {
    fn is_fresh(&self, last_refresh: Option<Instant>) -> bool {
        last_refresh
            .map(|at| at.elapsed() < self.ttl)
            .unwrap_or(false)
    }
}

/// Replace `region.table_name` with a fresh snapshot of `collection`.
pub fn refresh_table(
    conn: &Connection,
    region: &Region,
    table_name: &str,
    service: &ServiceModel,
    collection: &dyn ResourceCollection,
) -> Result<()> {
    let columns = schema::columns(service, collection.model())?;
    info!(region = %region, table = table_name, "Refreshing table");
    debug!(?columns, "Inferred columns");

    let qualified = format!(
        r#""{}"."{}""#,
        escape(region.schema_name()),
        escape(table_name)
    );
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| CloudqError::storage("begin", e.to_string()))?;

    tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", qualified))
        .map_err(|e| CloudqError::storage("drop table", format!("{}: {}", qualified, e)))?;

    let column_list = columns
        .iter()
        .map(|c| format!(r#""{}""#, escape(&c.name)))
        .collect::<Vec<_>>()
        .join(", ");
    tx.execute_batch(&format!("CREATE TABLE {} ({})", qualified, column_list))
        .map_err(|e| CloudqError::storage("create table", format!("{}: {}", qualified, e)))?;

    // A provider failure here unwinds before commit; the dropped table comes
    // back with the rollback.
    let items = collection.items()?;
    let count = items.len();

    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_sql = format!("INSERT INTO {} VALUES ({})", qualified, placeholders);
    {
        let mut stmt = tx
            .prepare(&insert_sql)
            .map_err(|e| CloudqError::storage("prepare insert", e.to_string()))?;
        for item in &items {
            let view = normalize_tags(item);
            let row = columns
                .iter()
                .map(|column| sql_value(view.field(&column.name)))
                .collect::<Result<Vec<_>>>()?;
            stmt.execute(params_from_iter(row))
                .map_err(|e| CloudqError::storage("insert", format!("{}: {}", qualified, e)))?;
        }
    }

    tx.commit()
        .map_err(|e| CloudqError::storage("commit", e.to_string()))?;
    debug!(table = table_name, rows = count, "Table refreshed");
    Ok(())
}

fn escape(ident: &str) -> String {
    ident.replace('"', "\"\"")
}

/// Map a JSON field value to a SQLite value: absent and JSON null become SQL
/// NULL, booleans become integers, structured values become JSON text.
fn sql_value(value: Option<&Value>) -> Result<rusqlite::types::Value> {
    use rusqlite::types::Value as SqlValue;
    Ok(match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(serde_json::to_string(other)?),
    })
}
