// src/targeting.rs

//! Target resolution: which hosts get a pack, which packs apply to a host.
//!
//! A host is eligible for a pack through either path:
//! - the pack targets the host explicitly, or
//! - the pack targets a live label and the host's latest result for that
//!   label is `matches = true`.
//!
//! Membership is a plain set union. A label without a result row for a host
//! contributes nothing for that host, a soft-deleted label contributes
//! nothing at all, and a pack with no targets reaches no host. Disabled and
//! deleted packs are never delivered.
//!
//! Everything here is a single read statement; results reflect whatever the
//! host-report path has written so far.

use crate::db::models::{LABEL_COLUMNS, Label, PACK_COLUMNS, Pack};
use crate::db::{ListOptions, OrderDirection};
use crate::error::{Result, StoreContext};
use crate::spec::TargetKind;
use rusqlite::{Connection, params};

/// Host id, the targeting join key
pub type HostId = i64;

/// Pack id
pub type PackId = i64;

/// Results are ordered by id unless the caller asks for something else
fn ordered_by_id(opts: &ListOptions) -> ListOptions {
    if opts.order_key.is_some() {
        opts.clone()
    } else {
        opts.clone().order_by("id", OrderDirection::Asc)
    }
}

/// Hosts that should receive `pack_id`: explicit targets plus matching label members
pub fn hosts_for_pack(conn: &Connection, pack_id: PackId, opts: &ListOptions) -> Result<Vec<HostId>> {
    let base = "
        SELECT h.id AS id
        FROM hosts h
        WHERE EXISTS (
            SELECT 1
            FROM pack_targets pt
            JOIN packs p ON p.id = pt.pack_id
            WHERE pt.pack_id = ?1
              AND NOT p.disabled
              AND NOT p.deleted
              AND (
                (pt.type = ?2 AND pt.target_id = h.id)
                OR (pt.type = ?3 AND EXISTS (
                    SELECT 1
                    FROM label_query_executions lqe
                    JOIN labels l ON l.id = lqe.label_id
                    WHERE lqe.label_id = pt.target_id
                      AND lqe.host_id = h.id
                      AND lqe.matches
                      AND NOT l.deleted
                ))
              )
        )";

    let sql = ordered_by_id(opts).apply_to_sql(base)?;
    let mut stmt = conn.prepare(&sql).context("listing hosts in pack")?;

    let ids = stmt
        .query_map(
            params![pack_id, TargetKind::Host.as_str(), TargetKind::Label.as_str()],
            |row| row.get(0),
        )?
        .collect::<std::result::Result<Vec<HostId>, _>>()
        .context("listing hosts in pack")?;
    Ok(ids)
}

/// Hosts targeted by `pack_id` directly, without label expansion
pub fn explicit_hosts_for_pack(
    conn: &Connection,
    pack_id: PackId,
    opts: &ListOptions,
) -> Result<Vec<HostId>> {
    let base = "
        SELECT h.id AS id
        FROM hosts h
        WHERE EXISTS (
            SELECT 1
            FROM pack_targets pt
            JOIN packs p ON p.id = pt.pack_id
            WHERE pt.pack_id = ?1
              AND NOT p.deleted
              AND pt.type = ?2
              AND pt.target_id = h.id
        )";

    let sql = ordered_by_id(opts).apply_to_sql(base)?;
    let mut stmt = conn.prepare(&sql).context("listing explicit hosts in pack")?;

    let ids = stmt
        .query_map(params![pack_id, TargetKind::Host.as_str()], |row| row.get(0))?
        .collect::<std::result::Result<Vec<HostId>, _>>()
        .context("listing explicit hosts in pack")?;
    Ok(ids)
}

/// Enabled, live packs that apply to `host_id`
pub fn packs_for_host(conn: &Connection, host_id: HostId) -> Result<Vec<Pack>> {
    let sql = format!(
        "SELECT {PACK_COLUMNS}
         FROM packs p
         WHERE NOT p.disabled
           AND NOT p.deleted
           AND EXISTS (
             SELECT 1
             FROM pack_targets pt
             WHERE pt.pack_id = p.id
               AND (
                 (pt.type = ?2 AND pt.target_id = ?1)
                 OR (pt.type = ?3 AND EXISTS (
                     SELECT 1
                     FROM label_query_executions lqe
                     JOIN labels l ON l.id = lqe.label_id
                     WHERE lqe.label_id = pt.target_id
                       AND lqe.host_id = ?1
                       AND lqe.matches
                       AND NOT l.deleted
                 ))
               )
           )
         ORDER BY p.id"
    );

    let mut stmt = conn.prepare(&sql).context("listing packs for host")?;
    let packs = stmt
        .query_map(
            params![host_id, TargetKind::Host.as_str(), TargetKind::Label.as_str()],
            Pack::from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("listing packs for host")?;
    Ok(packs)
}

/// Live labels targeted by `pack_id`
pub fn labels_for_pack(conn: &Connection, pack_id: PackId) -> Result<Vec<Label>> {
    let sql = format!(
        "SELECT {LABEL_COLUMNS}
         FROM labels
         WHERE NOT deleted
           AND id IN (
             SELECT target_id FROM pack_targets WHERE pack_id = ?1 AND type = ?2
           )
         ORDER BY name"
    );

    let mut stmt = conn.prepare(&sql).context("listing labels for pack")?;
    let labels = stmt
        .query_map(params![pack_id, TargetKind::Label.as_str()], Label::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("listing labels for pack")?;
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        self,
        models::{Host, PackTarget},
    };
    use crate::spec::{LabelMembership, LabelSpec};

    fn label(conn: &Connection, name: &str) -> i64 {
        Label::upsert(
            conn,
            &LabelSpec {
                name: name.to_string(),
                description: String::new(),
                query: "SELECT 1".to_string(),
                platform: None,
                membership: LabelMembership::Dynamic,
            },
        )
        .unwrap();
        Label::find_by_name(conn, name).unwrap().unwrap().id
    }

    fn report(conn: &Connection, host_id: i64, label_id: i64, matches: bool) {
        conn.execute(
            "INSERT OR REPLACE INTO label_query_executions (host_id, label_id, matches)
             VALUES (?1, ?2, ?3)",
            params![host_id, label_id, matches],
        )
        .unwrap();
    }

    fn pack(conn: &Connection, name: &str) -> i64 {
        Pack::upsert(conn, name, "", None).unwrap();
        Pack::id_by_name(conn, name).unwrap().unwrap()
    }

    #[test]
    fn test_pack_without_targets_reaches_nobody() {
        let conn = db::open_in_memory().unwrap();
        Host::new("a").insert(&conn).unwrap();
        let p = pack(&conn, "empty");

        assert!(hosts_for_pack(&conn, p, &ListOptions::default()).unwrap().is_empty());
        assert!(labels_for_pack(&conn, p).unwrap().is_empty());
    }

    #[test]
    fn test_label_and_host_paths_do_not_duplicate() {
        let conn = db::open_in_memory().unwrap();
        let l = label(&conn, "All Hosts");
        let h = Host::new("a").insert(&conn).unwrap();
        report(&conn, h, l, true);

        let p = pack(&conn, "base");
        PackTarget::insert_label(&conn, p, "All Hosts").unwrap();
        PackTarget::insert_host_id(&conn, p, h).unwrap();

        assert_eq!(hosts_for_pack(&conn, p, &ListOptions::default()).unwrap(), vec![h]);
        assert_eq!(explicit_hosts_for_pack(&conn, p, &ListOptions::default()).unwrap(), vec![h]);

        let packs = packs_for_host(&conn, h).unwrap();
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].id, p);
    }

    #[test]
    fn test_labels_for_pack_skips_deleted() {
        let conn = db::open_in_memory().unwrap();
        label(&conn, "macOS");
        label(&conn, "Ubuntu");
        let p = pack(&conn, "base");
        PackTarget::insert_label(&conn, p, "macOS").unwrap();
        PackTarget::insert_label(&conn, p, "Ubuntu").unwrap();

        Label::soft_delete_by_name(&conn, "macOS").unwrap();

        let names: Vec<String> = labels_for_pack(&conn, p)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Ubuntu"]);
    }

    #[test]
    fn test_hosts_for_pack_paging() {
        let conn = db::open_in_memory().unwrap();
        let l = label(&conn, "All Hosts");
        let p = pack(&conn, "base");
        PackTarget::insert_label(&conn, p, "All Hosts").unwrap();

        let mut hosts = Vec::new();
        for name in ["a", "b", "c", "d"] {
            let h = Host::new(name).insert(&conn).unwrap();
            report(&conn, h, l, true);
            hosts.push(h);
        }

        let page = hosts_for_pack(&conn, p, &ListOptions::page(1, 3)).unwrap();
        assert_eq!(page, vec![hosts[3]]);

        let desc = ListOptions::default().order_by("id", OrderDirection::Desc);
        let all = hosts_for_pack(&conn, p, &desc).unwrap();
        assert_eq!(all.first(), Some(&hosts[3]));
    }
}
