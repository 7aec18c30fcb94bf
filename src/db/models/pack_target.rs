// src/db/models/pack_target.rs

//! Pack target model
//!
//! One table holds both kinds of target, told apart by the `type` column.
//! Names from a spec are resolved to ids inside the INSERT itself, so a name
//! with no live row simply inserts nothing and the caller sees `false`.

use crate::error::{Result, StoreContext};
use crate::spec::TargetKind;
use rusqlite::{Connection, Row, params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackTarget {
    pub id: i64,
    pub pack_id: i64,
    pub kind: TargetKind,
    pub target_id: i64,
}

impl PackTarget {
    /// Target a live label by name. Returns false when no such label exists.
    pub fn insert_label(conn: &Connection, pack_id: i64, label_name: &str) -> Result<bool> {
        let rows = conn
            .execute(
                "INSERT INTO pack_targets (pack_id, type, target_id)
                 SELECT ?1, ?2, id FROM labels WHERE name = ?3 AND NOT deleted",
                params![pack_id, TargetKind::Label.as_str(), label_name],
            )
            .context("adding label to pack")?;
        Ok(rows == 1)
    }

    /// Target a host by hostname. Returns false when no such host exists.
    pub fn insert_host(conn: &Connection, pack_id: i64, hostname: &str) -> Result<bool> {
        let rows = conn
            .execute(
                "INSERT INTO pack_targets (pack_id, type, target_id)
                 SELECT ?1, ?2, id FROM hosts WHERE hostname = ?3",
                params![pack_id, TargetKind::Host.as_str(), hostname],
            )
            .context("adding host to pack")?;
        Ok(rows == 1)
    }

    /// Target a host by id
    pub fn insert_host_id(conn: &Connection, pack_id: i64, host_id: i64) -> Result<()> {
        conn.execute(
            "INSERT INTO pack_targets (pack_id, type, target_id) VALUES (?1, ?2, ?3)",
            params![pack_id, TargetKind::Host.as_str(), host_id],
        )
        .context("adding host to pack")?;
        Ok(())
    }

    pub fn delete_by_pack(conn: &Connection, pack_id: i64) -> Result<usize> {
        let rows = conn
            .execute("DELETE FROM pack_targets WHERE pack_id = ?1", [pack_id])
            .context("delete existing targets")?;
        Ok(rows)
    }

    /// All target rows of a pack in declared order
    pub fn find_by_pack(conn: &Connection, pack_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, pack_id, type, target_id FROM pack_targets
                 WHERE pack_id = ?1 ORDER BY id",
            )
            .context("get pack targets")?;

        let targets = stmt
            .query_map([pack_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("get pack targets")?;
        Ok(targets)
    }

    /// Names of the live labels a pack targets, in declared order
    pub fn label_names(conn: &Connection, pack_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare(
                "SELECT l.name
                 FROM pack_targets pt JOIN labels l ON pt.target_id = l.id
                 WHERE pt.pack_id = ?1 AND pt.type = ?2 AND NOT l.deleted
                 ORDER BY pt.id",
            )
            .context("get pack target labels")?;

        let names = stmt
            .query_map(params![pack_id, TargetKind::Label.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()
            .context("get pack target labels")?;
        Ok(names)
    }

    /// Hostnames a pack targets explicitly, in declared order
    pub fn hostnames(conn: &Connection, pack_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare(
                "SELECT h.hostname
                 FROM pack_targets pt JOIN hosts h ON pt.target_id = h.id
                 WHERE pt.pack_id = ?1 AND pt.type = ?2
                 ORDER BY pt.id",
            )
            .context("get pack target hosts")?;

        let names = stmt
            .query_map(params![pack_id, TargetKind::Host.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()
            .context("get pack target hosts")?;
        Ok(names)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kind: String = row.get(2)?;
        Ok(Self {
            id: row.get(0)?,
            pack_id: row.get(1)?,
            kind: kind.parse().map_err(|e: String| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
            })?,
            target_id: row.get(3)?,
        })
    }
}
