//! The relational cache
//!
//! One SQLite session per process, one persistent database file per region
//! attached as a schema named after the region. Resource collections are
//! materialized into regular tables on demand and queried with plain SQL.

mod engine;
mod functions;
mod loader;
mod regions;
mod schema;

pub use engine::{QueryEngine, QueryResult, QueryRow};
pub use loader::{AlwaysStale, FreshnessPolicy, TtlFreshness};
pub use schema::{columns, Column};
