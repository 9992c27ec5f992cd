#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # cloudq
//!
//! Query live cloud resource inventories with SQL.
//!
//! cloudq materializes each resource collection a query references into a
//! SQLite table on demand, then runs the query against those tables. One
//! persistent database file per region is attached to a single session as a
//! schema named after the region, so cross-region joins are plain
//! schema-qualified SQL.
//!
//! ```no_run
//! use std::sync::Arc;
//! use cloudq::provider::aws::AwsProvider;
//! use cloudq::{EngineOptions, QueryEngine, Result};
//!
//! fn main() -> Result<()> {
//!     let provider = AwsProvider::connect(None)?;
//!     let engine = QueryEngine::new(
//!         Arc::new(provider),
//!         EngineOptions::new(cloudq::config::default_data_dir()),
//!     )?;
//!
//!     let result = engine.execute(
//!         "select id, json_get(tags, 'env') as env from ec2_instances",
//!     )?;
//!     for row in &result.rows {
//!         println!("{:?}", row.values);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`provider`]: capability traits over the cloud SDK plus the AWS
//!   implementation; items, metadata models, tag normalization.
//! - [`sqlite`]: the relational cache -- query engine, per-region attach,
//!   transactional table refresh, schema inference, the `json_get` scalar
//!   function.
//! - [`parser`]: extraction of resource table references from query text.
//! - [`testing`]: an in-memory fake provider for tests.

pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod provider;
pub mod region;
pub mod sqlite;
pub mod testing;

pub use config::EngineOptions;
pub use error::{CloudqError, Result};
pub use parser::TableReference;
pub use region::Region;
pub use sqlite::{QueryEngine, QueryResult, QueryRow};
