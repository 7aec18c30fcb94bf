// src/db/schema.rs

//! Database schema versioning for fleetpack
//!
//! The schema is evolved through numbered migrations (see `migrations.rs`).
//! Each migration runs in its own transaction together with the version bump.

use super::migrations;
use crate::error::{Error, Result, StoreContext};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("creating schema_version table")?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .context("reading schema version")?
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .context("recording schema version")?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        debug!("Schema is up to date");
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        let tx = conn
            .unchecked_transaction()
            .context("begin migration transaction")?;
        apply_migration(&tx, version)?;
        set_schema_version(&tx, version)?;
        tx.commit().context("commit migration")?;
    }

    info!("Schema migration complete. Now at version {}", SCHEMA_VERSION);
    Ok(())
}

fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrations::migrate_v1(conn),
        2 => migrations::migrate_v2(conn),
        _ => Err(Error::Inconsistent(format!(
            "unknown migration version: {version}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_db() -> (NamedTempFile, Connection) {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        (temp_file, conn)
    }

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_schema_version_tracking() {
        let (_temp, conn) = create_test_db();

        assert_eq!(get_schema_version(&conn).unwrap(), 0);

        set_schema_version(&conn, 1).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_unreadable_schema_version_is_an_error() {
        let (_temp, conn) = create_test_db();
        conn.execute_batch(
            "CREATE TABLE schema_version (version TEXT PRIMARY KEY, applied_at TEXT);
             INSERT INTO schema_version (version) VALUES ('two');",
        )
        .unwrap();

        let err = get_schema_version(&conn).unwrap_err();
        assert!(matches!(err, Error::StoreError { .. }));
        assert!(migrate(&conn).is_err());
        assert!(!table_names(&conn).contains(&"packs".to_string()));
    }

    #[test]
    fn test_migrate_creates_all_tables() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        let tables = table_names(&conn);
        for table in [
            "queries",
            "labels",
            "hosts",
            "label_query_executions",
            "packs",
            "scheduled_queries",
            "pack_targets",
            "schema_version",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let (_temp, conn) = create_test_db();

        migrate(&conn).unwrap();
        let version1 = get_schema_version(&conn).unwrap();

        migrate(&conn).unwrap();
        let version2 = get_schema_version(&conn).unwrap();

        assert_eq!(version1, version2);
        assert_eq!(version1, SCHEMA_VERSION);
    }

    #[test]
    fn test_pack_name_is_unique() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        conn.execute("INSERT INTO packs (name) VALUES ('base')", [])
            .unwrap();
        let result = conn.execute("INSERT INTO packs (name) VALUES ('base')", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_scheduled_query_requires_known_query() {
        let (_temp, conn) = create_test_db();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        migrate(&conn).unwrap();

        conn.execute("INSERT INTO packs (name) VALUES ('base')", [])
            .unwrap();
        let result = conn.execute(
            "INSERT INTO scheduled_queries (pack_id, query_name, name) VALUES (1, 'missing', 'missing')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_shard_range_is_checked() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        conn.execute("INSERT INTO packs (name) VALUES ('base')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO queries (name, query) VALUES ('uptime', 'SELECT * FROM uptime')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO scheduled_queries (pack_id, query_name, name, shard) VALUES (1, 'uptime', 'uptime', 101)",
            [],
        );
        assert!(result.is_err());
    }
}
