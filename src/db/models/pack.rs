// src/db/models/pack.rs

//! Pack model
//!
//! A pack row is addressed by its name. Writing a pack is always an upsert
//! that also clears the tombstone, so a deleted pack re-applied under the
//! same name comes back with its original id.

use crate::db::ListOptions;
use crate::error::{Error, Result, StoreContext};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Database representation of a pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pack {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub platform: Option<String>,
    /// Disabled packs stay visible but are never delivered to hosts
    pub disabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) const COLUMNS: &str =
    "id, name, description, platform, disabled, created_at, updated_at";

impl Pack {
    /// Insert a pack or update the existing row with the same name.
    ///
    /// Only the declarative fields are touched; `disabled` keeps its value.
    pub fn upsert(
        conn: &Connection,
        name: &str,
        description: &str,
        platform: Option<&str>,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO packs (name, description, platform)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                description = excluded.description,
                platform = excluded.platform,
                deleted = 0,
                updated_at = CURRENT_TIMESTAMP",
            params![name, description, platform],
        )
        .context("insert/update pack")?;
        Ok(())
    }

    /// Id of the row holding `name`, deleted or not
    pub fn id_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row("SELECT id FROM packs WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()
            .context("getting pack ID")?;
        Ok(id)
    }

    /// Fetch a live pack by id
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Self> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM packs WHERE id = ?1 AND NOT deleted"
            ))
            .context("getting pack")?;

        let pack = stmt
            .query_row([id], Self::from_row)
            .optional()
            .context("getting pack")?;
        pack.ok_or_else(|| Error::not_found("Pack", id))
    }

    /// Fetch a live pack by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM packs WHERE name = ?1 AND NOT deleted"
            ))
            .context("fetching packs by name")?;

        let pack = stmt
            .query_row([name], Self::from_row)
            .optional()
            .context("fetching packs by name")?;
        Ok(pack)
    }

    /// List live packs
    pub fn list(conn: &Connection, opts: &ListOptions) -> Result<Vec<Self>> {
        let sql = opts.apply_to_sql(&format!("SELECT {COLUMNS} FROM packs WHERE NOT deleted"))?;
        let mut stmt = conn.prepare(&sql).context("listing packs")?;

        let packs = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("listing packs")?;
        Ok(packs)
    }

    /// Soft delete a live pack so it no longer shows up in results
    pub fn soft_delete(conn: &Connection, id: i64) -> Result<()> {
        let rows = conn
            .execute(
                "UPDATE packs SET deleted = 1, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?1 AND NOT deleted",
                [id],
            )
            .context("deleting pack")?;

        if rows == 0 {
            return Err(Error::not_found("Pack", id));
        }
        Ok(())
    }

    /// Turn delivery of a live pack on or off
    pub fn set_disabled(conn: &Connection, id: i64, disabled: bool) -> Result<()> {
        let rows = conn
            .execute(
                "UPDATE packs SET disabled = ?1, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?2 AND NOT deleted",
                params![disabled, id],
            )
            .context("updating pack disabled flag")?;

        if rows == 0 {
            return Err(Error::not_found("Pack", id));
        }
        Ok(())
    }

    /// Map a row selected with [`COLUMNS`]
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            platform: row.get(3)?,
            disabled: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_upsert_and_lookup() {
        let conn = db::open_in_memory().unwrap();

        Pack::upsert(&conn, "base", "Base pack", Some("linux")).unwrap();
        let id = Pack::id_by_name(&conn, "base").unwrap().unwrap();

        let pack = Pack::find_by_id(&conn, id).unwrap();
        assert_eq!(pack.name, "base");
        assert_eq!(pack.description, "Base pack");
        assert_eq!(pack.platform.as_deref(), Some("linux"));
        assert!(!pack.disabled);

        Pack::upsert(&conn, "base", "Changed", None).unwrap();
        let pack = Pack::find_by_name(&conn, "base").unwrap().unwrap();
        assert_eq!(pack.id, id);
        assert_eq!(pack.description, "Changed");
        assert_eq!(pack.platform, None);
    }

    #[test]
    fn test_missing_pack_is_not_found() {
        let conn = db::open_in_memory().unwrap();
        assert!(Pack::find_by_id(&conn, 42).unwrap_err().is_not_found());
        assert!(Pack::find_by_name(&conn, "nope").unwrap().is_none());
        assert!(Pack::soft_delete(&conn, 42).unwrap_err().is_not_found());
        assert!(Pack::set_disabled(&conn, 42, true).unwrap_err().is_not_found());
    }

    #[test]
    fn test_soft_delete_and_resurrect() {
        let conn = db::open_in_memory().unwrap();

        Pack::upsert(&conn, "base", "", None).unwrap();
        let id = Pack::id_by_name(&conn, "base").unwrap().unwrap();
        Pack::soft_delete(&conn, id).unwrap();

        assert!(Pack::find_by_id(&conn, id).unwrap_err().is_not_found());
        assert!(Pack::find_by_name(&conn, "base").unwrap().is_none());
        assert!(Pack::list(&conn, &ListOptions::default()).unwrap().is_empty());
        // The row is still there
        assert_eq!(Pack::id_by_name(&conn, "base").unwrap(), Some(id));

        Pack::upsert(&conn, "base", "", None).unwrap();
        assert_eq!(Pack::find_by_name(&conn, "base").unwrap().unwrap().id, id);
    }

    #[test]
    fn test_disabled_survives_upsert() {
        let conn = db::open_in_memory().unwrap();

        Pack::upsert(&conn, "base", "", None).unwrap();
        let id = Pack::id_by_name(&conn, "base").unwrap().unwrap();
        Pack::set_disabled(&conn, id, true).unwrap();

        Pack::upsert(&conn, "base", "again", None).unwrap();
        assert!(Pack::find_by_id(&conn, id).unwrap().disabled);
    }

    #[test]
    fn test_list_paging() {
        let conn = db::open_in_memory().unwrap();
        for name in ["a", "b", "c", "d", "e"] {
            Pack::upsert(&conn, name, "", None).unwrap();
        }

        let opts = ListOptions::page(1, 2).order_by("name", db::OrderDirection::Asc);
        let names: Vec<String> = Pack::list(&conn, &opts)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["c", "d"]);
    }
}
