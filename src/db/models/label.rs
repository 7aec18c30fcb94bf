// src/db/models/label.rs

//! Label model: named host predicates
//!
//! Labels are soft-deleted. A deleted label keeps its row (and its name), so
//! packs that still point at it degrade to "no hosts through this label"
//! instead of failing, and re-applying the label resurrects the same id.

use crate::db::ListOptions;
use crate::error::{Error, Result, StoreContext};
use crate::spec::{LabelMembership, LabelSpec};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Database representation of a label
#[derive(Debug, Clone)]
pub struct Label {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub query: String,
    pub platform: Option<String>,
    pub membership: LabelMembership,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) const COLUMNS: &str =
    "id, name, description, query, platform, membership_type, created_at, updated_at";

impl Label {
    /// Insert or update a label by name, clearing its tombstone
    pub fn upsert(conn: &Connection, spec: &LabelSpec) -> Result<()> {
        conn.execute(
            "INSERT INTO labels (name, description, query, platform, membership_type)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                description = excluded.description,
                query = excluded.query,
                platform = excluded.platform,
                membership_type = excluded.membership_type,
                deleted = 0,
                updated_at = CURRENT_TIMESTAMP",
            params![
                &spec.name,
                &spec.description,
                &spec.query,
                &spec.platform,
                spec.membership.as_str(),
            ],
        )
        .context("insert/update label")?;
        Ok(())
    }

    /// Fetch a live label by id
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Self> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM labels WHERE id = ?1 AND NOT deleted"
            ))
            .context("getting label")?;

        let label = stmt
            .query_row([id], Self::from_row)
            .optional()
            .context("getting label")?;
        label.ok_or_else(|| Error::not_found("Label", id))
    }

    /// Fetch a live label by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM labels WHERE name = ?1 AND NOT deleted"
            ))
            .context("fetching label by name")?;

        let label = stmt
            .query_row([name], Self::from_row)
            .optional()
            .context("fetching label by name")?;
        Ok(label)
    }

    /// List live labels
    pub fn list(conn: &Connection, opts: &ListOptions) -> Result<Vec<Self>> {
        let sql = opts.apply_to_sql(&format!(
            "SELECT {COLUMNS} FROM labels WHERE NOT deleted"
        ))?;
        let mut stmt = conn.prepare(&sql).context("listing labels")?;

        let labels = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("listing labels")?;
        Ok(labels)
    }

    /// Soft delete a live label by name
    pub fn soft_delete_by_name(conn: &Connection, name: &str) -> Result<()> {
        let rows = conn
            .execute(
                "UPDATE labels SET deleted = 1, updated_at = CURRENT_TIMESTAMP
                 WHERE name = ?1 AND NOT deleted",
                [name],
            )
            .context("deleting label")?;

        if rows == 0 {
            return Err(Error::not_found("Label", name));
        }
        Ok(())
    }

    pub fn to_spec(&self) -> LabelSpec {
        LabelSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            query: self.query.clone(),
            platform: self.platform.clone(),
            membership: self.membership,
        }
    }

    /// Map a row selected with [`COLUMNS`] (optionally table-qualified)
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let membership: String = row.get(5)?;
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            query: row.get(3)?,
            platform: row.get(4)?,
            membership: membership.parse().map_err(|e: String| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    e.into(),
                )
            })?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn spec(name: &str) -> LabelSpec {
        LabelSpec {
            name: name.to_string(),
            description: format!("{name} hosts"),
            query: "SELECT 1".to_string(),
            platform: None,
            membership: LabelMembership::Dynamic,
        }
    }

    #[test]
    fn test_label_crud() {
        let conn = db::open_in_memory().unwrap();

        Label::upsert(&conn, &spec("macOS")).unwrap();
        let label = Label::find_by_name(&conn, "macOS").unwrap().unwrap();
        assert_eq!(label.description, "macOS hosts");
        assert_eq!(label.to_string(), "macOS");

        let by_id = Label::find_by_id(&conn, label.id).unwrap();
        assert_eq!(by_id.name, "macOS");
        assert_eq!(by_id.to_spec(), spec("macOS"));
    }

    #[test]
    fn test_soft_delete_hides_and_upsert_resurrects() {
        let conn = db::open_in_memory().unwrap();

        Label::upsert(&conn, &spec("macOS")).unwrap();
        let id = Label::find_by_name(&conn, "macOS").unwrap().unwrap().id;

        Label::soft_delete_by_name(&conn, "macOS").unwrap();
        assert!(Label::find_by_name(&conn, "macOS").unwrap().is_none());
        assert!(Label::find_by_id(&conn, id).unwrap_err().is_not_found());
        assert!(Label::list(&conn, &ListOptions::default()).unwrap().is_empty());

        // Deleting twice is a not-found
        assert!(Label::soft_delete_by_name(&conn, "macOS").unwrap_err().is_not_found());

        Label::upsert(&conn, &spec("macOS")).unwrap();
        let back = Label::find_by_name(&conn, "macOS").unwrap().unwrap();
        assert_eq!(back.id, id);
    }

    #[test]
    fn test_list_ordering() {
        let conn = db::open_in_memory().unwrap();
        for name in ["b", "c", "a"] {
            Label::upsert(&conn, &spec(name)).unwrap();
        }

        let opts = ListOptions::default().order_by("name", crate::db::OrderDirection::Asc);
        let names: Vec<String> = Label::list(&conn, &opts)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
