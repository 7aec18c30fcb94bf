// src/db/models/query.rs

//! Query model: named query bodies that packs reference by name

use crate::error::{Result, StoreContext};
use crate::spec::QuerySpec;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// A stored query
#[derive(Debug, Clone)]
pub struct Query {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub query: String,
    pub platform: Option<String>,
    pub min_version: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

const COLUMNS: &str = "id, name, description, query, platform, min_version, created_at, updated_at";

impl Query {
    /// Insert or update a query by name
    pub fn upsert(conn: &Connection, spec: &QuerySpec) -> Result<()> {
        conn.execute(
            "INSERT INTO queries (name, description, query, platform, min_version)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                description = excluded.description,
                query = excluded.query,
                platform = excluded.platform,
                min_version = excluded.min_version,
                updated_at = CURRENT_TIMESTAMP",
            params![
                &spec.name,
                &spec.description,
                &spec.query,
                &spec.platform,
                &spec.min_version,
            ],
        )
        .context("insert/update query")?;
        Ok(())
    }

    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn
            .prepare(&format!("SELECT {COLUMNS} FROM queries WHERE name = ?1"))
            .context("fetching query by name")?;

        let query = stmt
            .query_row([name], Self::from_row)
            .optional()
            .context("fetching query by name")?;
        Ok(query)
    }

    /// List all queries ordered by name
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn
            .prepare(&format!("SELECT {COLUMNS} FROM queries ORDER BY name"))
            .context("listing queries")?;

        let queries = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("listing queries")?;
        Ok(queries)
    }

    /// Remove a query; schedules referencing it cascade away with it
    pub fn delete_by_name(conn: &Connection, name: &str) -> Result<bool> {
        let rows = conn
            .execute("DELETE FROM queries WHERE name = ?1", [name])
            .context("deleting query")?;
        Ok(rows > 0)
    }

    pub fn to_spec(&self) -> QuerySpec {
        QuerySpec {
            name: self.name.clone(),
            description: self.description.clone(),
            query: self.query.clone(),
            platform: self.platform.clone(),
            min_version: self.min_version.clone(),
        }
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            query: row.get(3)?,
            platform: row.get(4)?,
            min_version: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}
