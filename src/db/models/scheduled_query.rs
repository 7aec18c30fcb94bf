// src/db/models/scheduled_query.rs

//! Scheduled query model: one entry of a pack's schedule
//!
//! Rows are owned by their pack and replaced as a whole set; insertion order
//! (the row id) is the declared order.

use crate::error::{Result, StoreContext};
use crate::spec::PackSpecQuery;
use rusqlite::{Connection, Row, params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledQuery {
    pub id: Option<i64>,
    pub pack_id: i64,
    pub query_name: String,
    pub name: String,
    pub description: String,
    pub interval: u32,
    pub snapshot: bool,
    pub removed: bool,
    pub shard: Option<u32>,
    pub platform: Option<String>,
    pub version: Option<String>,
}

impl ScheduledQuery {
    pub fn from_spec(pack_id: i64, spec: &PackSpecQuery) -> Self {
        Self {
            id: None,
            pack_id,
            query_name: spec.query_name.clone(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            interval: spec.interval,
            snapshot: spec.snapshot,
            removed: spec.removed,
            shard: spec.shard,
            platform: spec.platform.clone(),
            version: spec.version.clone(),
        }
    }

    pub fn to_spec(&self) -> PackSpecQuery {
        PackSpecQuery {
            query_name: self.query_name.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            interval: self.interval,
            snapshot: self.snapshot,
            removed: self.removed,
            shard: self.shard,
            platform: self.platform.clone(),
            version: self.version.clone(),
        }
    }

    /// Insert this entry.
    ///
    /// Returns the raw SQLite error so the caller can tell a dangling
    /// `query_name` (foreign key failure) from any other write failure.
    pub fn insert(&mut self, conn: &Connection) -> rusqlite::Result<i64> {
        conn.execute(
            "INSERT INTO scheduled_queries (
                pack_id, query_name, name, description, interval,
                snapshot, removed, shard, platform, version
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                self.pack_id,
                &self.query_name,
                &self.name,
                &self.description,
                self.interval,
                self.snapshot,
                self.removed,
                self.shard,
                &self.platform,
                &self.version,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// All entries of a pack in declared order
    pub fn find_by_pack(conn: &Connection, pack_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, pack_id, query_name, name, description, interval,
                        snapshot, removed, shard, platform, version
                 FROM scheduled_queries WHERE pack_id = ?1 ORDER BY id",
            )
            .context("get pack queries")?;

        let queries = stmt
            .query_map([pack_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("get pack queries")?;
        Ok(queries)
    }

    /// Remove every entry of a pack
    pub fn delete_by_pack(conn: &Connection, pack_id: i64) -> Result<usize> {
        let rows = conn
            .execute("DELETE FROM scheduled_queries WHERE pack_id = ?1", [pack_id])
            .context("delete existing scheduled queries")?;
        Ok(rows)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            pack_id: row.get(1)?,
            query_name: row.get(2)?,
            name: row.get(3)?,
            description: row.get(4)?,
            interval: row.get(5)?,
            snapshot: row.get(6)?,
            removed: row.get(7)?,
            shard: row.get(8)?,
            platform: row.get(9)?,
            version: row.get(10)?,
        })
    }
}
