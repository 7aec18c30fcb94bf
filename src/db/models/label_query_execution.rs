// src/db/models/label_query_execution.rs

//! Read access to per-host label results
//!
//! The host-report path owns this table and overwrites one row per
//! (host, label) with the latest evaluation. Nothing here writes to it. A
//! missing row means "not evaluated yet" and counts as not matching.

use crate::error::{Result, StoreContext};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, Row};

/// SQLite `CURRENT_TIMESTAMP` format
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelQueryExecution {
    pub host_id: i64,
    pub label_id: i64,
    pub label_name: String,
    pub matches: bool,
    pub updated_at: String,
}

impl LabelQueryExecution {
    /// Latest result a host reported for each live label, ordered by label name.
    /// Results for soft-deleted labels are left out.
    pub fn for_host(conn: &Connection, host_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn
            .prepare(
                "SELECT lqe.host_id, lqe.label_id, l.name, lqe.matches, lqe.updated_at
                 FROM label_query_executions lqe
                 JOIN labels l ON l.id = lqe.label_id AND NOT l.deleted
                 WHERE lqe.host_id = ?1
                 ORDER BY l.name",
            )
            .context("listing label results for host")?;

        let rows = stmt
            .query_map([host_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("listing label results for host")?;
        Ok(rows)
    }

    /// When the host last evaluated the label, if the stored value parses
    pub fn evaluated_at(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.updated_at, TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            host_id: row.get(0)?,
            label_id: row.get(1)?,
            label_name: row.get(2)?,
            matches: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}
