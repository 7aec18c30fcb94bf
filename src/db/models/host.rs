// src/db/models/host.rs

//! Host model
//!
//! Enrollment is owned by another subsystem; fleetpack only needs a host's
//! id (the targeting join key) and its hostname (how specs name it).

use crate::error::{Error, Result, StoreContext};
use rusqlite::{Connection, OptionalExtension, Row, params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub id: Option<i64>,
    pub hostname: String,
    pub platform: Option<String>,
    pub created_at: Option<String>,
}

impl Host {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            id: None,
            hostname: hostname.into(),
            platform: None,
            created_at: None,
        }
    }

    /// Insert this host into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO hosts (hostname, platform) VALUES (?1, ?2)",
            params![&self.hostname, &self.platform],
        )
        .context("inserting host")?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Self> {
        let host = conn
            .query_row(
                "SELECT id, hostname, platform, created_at FROM hosts WHERE id = ?1",
                [id],
                Self::from_row,
            )
            .optional()
            .context("getting host")?;
        host.ok_or_else(|| Error::not_found("Host", id))
    }

    pub fn find_by_hostname(conn: &Connection, hostname: &str) -> Result<Option<Self>> {
        let host = conn
            .query_row(
                "SELECT id, hostname, platform, created_at FROM hosts WHERE hostname = ?1",
                [hostname],
                Self::from_row,
            )
            .optional()
            .context("fetching host by hostname")?;
        Ok(host)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            hostname: row.get(1)?,
            platform: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}
