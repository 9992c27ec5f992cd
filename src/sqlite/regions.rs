//! Per-region database attachment
//!
//! Every region gets one persistent SQLite file under the data directory,
//! named by its normalized region string. The file is lazily attached to the
//! session as a schema named after the region, which is what makes
//! cross-region joins (`us_east_1.ec2_instances JOIN eu_west_1.ec2_volumes`)
//! possible. Attaching is idempotent: the current `PRAGMA database_list` is
//! consulted first.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tracing::info;

use crate::error::{CloudqError, Result};
use crate::region::Region;

/// Path of the region's database file under `data_dir`.
pub fn db_path(data_dir: &Path, region: &Region) -> PathBuf {
    data_dir.join(format!("{}.db", region.schema_name()))
}

/// Names of all schemas currently attached to the session.
pub fn attached_schemas(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("PRAGMA database_list")
        .map_err(|e| CloudqError::storage("database_list", e.to_string()))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| CloudqError::storage("database_list", e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| CloudqError::storage("database_list", e.to_string()))?;
    Ok(names)
}

/// Attach the region's database file as a schema, creating the data
/// directory and file on first use. Does nothing if already attached.
pub fn attach_region(conn: &Connection, data_dir: &Path, region: &Region) -> Result<()> {
    if attached_schemas(conn)?
        .iter()
        .any(|name| name == region.schema_name())
    {
        return Ok(());
    }

    fs::create_dir_all(data_dir)
        .map_err(|e| CloudqError::storage("create data dir", e.to_string()))?;
    let path = db_path(data_dir, region);
    info!(region = %region, path = %path.display(), "Attaching database for region");
    conn.execute(
        "ATTACH DATABASE ?1 AS ?2",
        params![path.to_string_lossy(), region.schema_name()],
    )
    .map_err(|e| {
        CloudqError::storage("attach", format!("{}: {}", path.display(), e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        let region = Region::new("us-east-1");

        attach_region(&conn, dir.path(), &region).unwrap();

        assert!(db_path(dir.path(), &region).exists());
        assert!(attached_schemas(&conn)
            .unwrap()
            .contains(&"us_east_1".to_string()));
    }

    #[test]
    fn test_attach_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        let region = Region::new("eu_west_1");

        attach_region(&conn, dir.path(), &region).unwrap();
        attach_region(&conn, dir.path(), &region).unwrap();

        let count = attached_schemas(&conn)
            .unwrap()
            .iter()
            .filter(|name| *name == "eu_west_1")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_unopenable_path_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the db file should be makes the open fail.
        let region = Region::new("ap_south_1");
        fs::create_dir_all(db_path(dir.path(), &region)).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let err = attach_region(&conn, dir.path(), &region).unwrap_err();
        assert!(matches!(err, CloudqError::Storage(_)));
    }
}
