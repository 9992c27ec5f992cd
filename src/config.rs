//! Engine configuration and defaults
//!
//! Options are assembled from CLI arguments in `main` and passed explicitly
//! to [`QueryEngine::new`](crate::QueryEngine::new); there is no ambient
//! global configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Directory under the user's home dir that holds one SQLite file per region.
pub const DEFAULT_DATA_DIR_NAME: &str = ".cloudq";

/// Default log filter when `--log-level` and `RUST_LOG` are both unset.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Options for a [`QueryEngine`](crate::QueryEngine).
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Directory holding the per-region database files.
    pub data_dir: PathBuf,
    /// How long a loaded table stays fresh. `None` means every query reloads
    /// the tables it references.
    pub table_ttl: Option<Duration>,
}

impl EngineOptions {
    /// Options rooted at the given data directory, with the baseline
    /// always-reload freshness behaviour.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            table_ttl: None,
        }
    }

    /// Keep loaded tables for `ttl` before reloading them.
    pub fn with_table_ttl(mut self, ttl: Duration) -> Self {
        self.table_ttl = Some(ttl);
        self
    }
}

/// The per-user default data directory (`~/.cloudq`).
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DATA_DIR_NAME)
}
