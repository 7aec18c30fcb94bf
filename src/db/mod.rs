// src/db/mod.rs

//! Database layer for fleetpack
//!
//! All state lives in a single SQLite file. Connections are opened per
//! caller; there is no shared in-process handle. Multi-statement writes go
//! through [`transaction`], which rolls back on the first error.

mod list_options;
mod migrations;
pub mod models;
pub mod schema;

pub use list_options::{DEFAULT_PER_PAGE, ListOptions, OrderDirection};

use crate::error::{Result, StoreContext};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// How long a connection waits on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create the database file (if needed) and bring the schema up to date
pub fn init(db_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = open(db_path)?;
    schema::migrate(&conn)?;
    info!("Database initialized at {}", db_path);
    Ok(())
}

/// Open an existing database with the default busy timeout
pub fn open(db_path: &str) -> Result<Connection> {
    open_with_timeout(db_path, DEFAULT_BUSY_TIMEOUT)
}

/// Open a database, enabling foreign keys and WAL so readers never block the writer
pub fn open_with_timeout(db_path: &str, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(db_path).context(format!("opening database {db_path}"))?;
    configure(&conn, busy_timeout)?;
    debug!("Opened database {}", db_path);
    Ok(conn)
}

/// Open a private in-memory database with the schema applied
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("opening in-memory database")?;
    configure(&conn, DEFAULT_BUSY_TIMEOUT)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout)
        .context("setting busy timeout")?;
    conn.pragma_update(None, "foreign_keys", true)
        .context("enabling foreign keys")?;
    // In-memory databases report "memory" here; that is fine
    let _mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .context("enabling WAL journal")?;
    Ok(())
}

/// Run `f` inside a write transaction that takes the write lock up front.
///
/// Commits when `f` succeeds; rolls back when it fails. A transaction that
/// SQLite already rolled back is left alone; any other rollback failure
/// means the connection is in an unknown state and panics.
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    scoped(conn, TransactionBehavior::Immediate, f)
}

/// Run `f` inside a deferred transaction so every read sees one snapshot
pub fn read_transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    scoped(conn, TransactionBehavior::Deferred, f)
}

fn scoped<T, F>(conn: &mut Connection, behavior: TransactionBehavior, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn
        .transaction_with_behavior(behavior)
        .context("begin transaction")?;

    match f(&tx) {
        Ok(value) => {
            tx.commit().context("commit transaction")?;
            Ok(value)
        }
        Err(err) => {
            // SQLite ends the transaction itself on interrupt and some
            // FULL/IOERR/BUSY failures; there is nothing left to roll back
            if tx.is_autocommit() {
                return Err(err);
            }
            if let Err(rb_err) = tx.rollback() {
                panic!("got err '{rb_err}' rolling back after err '{err}'");
            }
            Err(err)
        }
    }
}

/// True when a statement failed on a FOREIGN KEY constraint
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}
