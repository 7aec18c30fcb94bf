// src/reconcile.rs

//! Spec reconciliation: converge the database onto submitted specs.
//!
//! Every `apply_*` call is one write transaction covering the whole batch.
//! If any spec fails, nothing from the batch is kept and the error says
//! which spec and which step failed.
//!
//! Applying is idempotent. Packs are upserted by name; their scheduled
//! queries and targets are deleted and re-inserted from the spec, so the
//! stored child collections always equal the last applied spec.

use crate::db::models::{Label, Pack, PackTarget, Query, ScheduledQuery};
use crate::db::{self, ListOptions, OrderDirection};
use crate::error::{Error, Result};
use crate::spec::{LabelSpec, PackSpec, PackSpecTargets, QuerySpec, SpecGroup, SpecKind};
use rusqlite::Connection;
use tracing::{debug, info};

fn applying(kind: SpecKind, name: &str) -> impl FnOnce(Error) -> Error + '_ {
    move |source| Error::ApplySpec {
        kind: kind.as_str(),
        name: name.to_string(),
        source: Box::new(source),
    }
}

/// Apply pack specs as one all-or-nothing batch
pub fn apply_pack_specs(conn: &mut Connection, specs: &[PackSpec]) -> Result<()> {
    db::transaction(conn, |tx| apply_packs(tx, specs))?;
    info!("Applied {} pack spec(s)", specs.len());
    Ok(())
}

/// Apply query specs as one all-or-nothing batch
pub fn apply_query_specs(conn: &mut Connection, specs: &[QuerySpec]) -> Result<()> {
    db::transaction(conn, |tx| apply_queries(tx, specs))?;
    info!("Applied {} query spec(s)", specs.len());
    Ok(())
}

/// Apply label specs as one all-or-nothing batch
pub fn apply_label_specs(conn: &mut Connection, specs: &[LabelSpec]) -> Result<()> {
    db::transaction(conn, |tx| apply_labels(tx, specs))?;
    info!("Applied {} label spec(s)", specs.len());
    Ok(())
}

/// Apply a mixed submission in one transaction: queries, then labels, then
/// packs, so packs can reference queries and labels from the same file.
pub fn apply_specs(conn: &mut Connection, group: &SpecGroup) -> Result<()> {
    db::transaction(conn, |tx| {
        apply_queries(tx, &group.queries)?;
        apply_labels(tx, &group.labels)?;
        apply_packs(tx, &group.packs)
    })?;
    info!(
        queries = group.queries.len(),
        labels = group.labels.len(),
        packs = group.packs.len(),
        "Applied spec group"
    );
    Ok(())
}

fn apply_queries(conn: &Connection, specs: &[QuerySpec]) -> Result<()> {
    for spec in specs {
        spec.validate()
            .and_then(|_| Query::upsert(conn, spec))
            .map_err(applying(SpecKind::Query, &spec.name))?;
    }
    Ok(())
}

fn apply_labels(conn: &Connection, specs: &[LabelSpec]) -> Result<()> {
    for spec in specs {
        spec.validate()
            .and_then(|_| Label::upsert(conn, spec))
            .map_err(applying(SpecKind::Label, &spec.name))?;
    }
    Ok(())
}

fn apply_packs(conn: &Connection, specs: &[PackSpec]) -> Result<()> {
    for spec in specs {
        apply_pack_spec(conn, spec).map_err(applying(SpecKind::Pack, &spec.name))?;
    }
    Ok(())
}

fn apply_pack_spec(conn: &Connection, spec: &PackSpec) -> Result<()> {
    spec.validate()?;

    Pack::upsert(conn, &spec.name, &spec.description, spec.platform.as_deref())?;

    // Look the id up by name: the upsert does not report it when it only updated
    let pack_id = Pack::id_by_name(conn, &spec.name)?.ok_or_else(|| {
        Error::Inconsistent(format!("pack '{}' not found right after upsert", spec.name))
    })?;

    let removed = ScheduledQuery::delete_by_pack(conn, pack_id)?;
    for q in &spec.queries {
        let mut scheduled = ScheduledQuery::from_spec(pack_id, q);
        match scheduled.insert(conn) {
            Ok(_) => {}
            Err(e) if db::is_foreign_key_violation(&e) => {
                return Err(Error::UnknownQuery {
                    query: q.query_name.clone(),
                    pack: spec.name.clone(),
                });
            }
            Err(e) => {
                return Err(Error::StoreError {
                    context: format!("adding query {} referencing {}", q.name, q.query_name),
                    source: e,
                });
            }
        }
    }
    debug!(
        "Pack {} (id {}): replaced {} scheduled queries with {}",
        spec.name,
        pack_id,
        removed,
        spec.queries.len()
    );

    PackTarget::delete_by_pack(conn, pack_id)?;
    for label in &spec.targets.labels {
        if !PackTarget::insert_label(conn, pack_id, label)? {
            return Err(Error::UnknownLabel {
                label: label.clone(),
                pack: spec.name.clone(),
            });
        }
    }
    for host in &spec.targets.hosts {
        if !PackTarget::insert_host(conn, pack_id, host)? {
            return Err(Error::UnknownHost {
                host: host.clone(),
                pack: spec.name.clone(),
            });
        }
    }

    Ok(())
}

/// Read every live pack back as a spec, ordered by name
pub fn get_pack_specs(conn: &mut Connection) -> Result<Vec<PackSpec>> {
    db::read_transaction(conn, |tx| read_pack_specs(tx))
}

/// Read every query back as a spec, ordered by name
pub fn get_query_specs(conn: &Connection) -> Result<Vec<QuerySpec>> {
    Ok(Query::list_all(conn)?.iter().map(Query::to_spec).collect())
}

/// Read every live label back as a spec, ordered by name
pub fn get_label_specs(conn: &Connection) -> Result<Vec<LabelSpec>> {
    let opts = ListOptions::default().order_by("name", OrderDirection::Asc);
    Ok(Label::list(conn, &opts)?.iter().map(Label::to_spec).collect())
}

/// Read everything back as one group from a single snapshot, so every
/// query a pack schedules is part of the same group
pub fn get_specs(conn: &mut Connection) -> Result<SpecGroup> {
    db::read_transaction(conn, |tx| {
        Ok(SpecGroup {
            queries: get_query_specs(tx)?,
            labels: get_label_specs(tx)?,
            packs: read_pack_specs(tx)?,
        })
    })
}

/// Basic fields, then targets, then scheduled queries
fn read_pack_specs(conn: &Connection) -> Result<Vec<PackSpec>> {
    let opts = ListOptions::default().order_by("name", OrderDirection::Asc);
    let packs = Pack::list(conn, &opts)?;

    let mut specs = Vec::with_capacity(packs.len());
    for pack in &packs {
        specs.push(PackSpec {
            name: pack.name.clone(),
            description: pack.description.clone(),
            platform: pack.platform.clone(),
            queries: Vec::new(),
            targets: PackSpecTargets {
                labels: PackTarget::label_names(conn, pack.id)?,
                hosts: PackTarget::hostnames(conn, pack.id)?,
            },
        });
    }

    for (spec, pack) in specs.iter_mut().zip(&packs) {
        spec.queries = ScheduledQuery::find_by_pack(conn, pack.id)?
            .iter()
            .map(ScheduledQuery::to_spec)
            .collect();
    }

    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{LabelMembership, PackSpecQuery};

    fn query(name: &str) -> QuerySpec {
        QuerySpec {
            name: name.to_string(),
            description: String::new(),
            query: format!("SELECT * FROM {name}"),
            platform: None,
            min_version: None,
        }
    }

    fn label(name: &str) -> LabelSpec {
        LabelSpec {
            name: name.to_string(),
            description: String::new(),
            query: "SELECT 1".to_string(),
            platform: None,
            membership: LabelMembership::Dynamic,
        }
    }

    #[test]
    fn test_apply_group_in_one_pass() {
        let mut conn = db::open_in_memory().unwrap();

        let mut pack = PackSpec::new("base");
        pack.queries.push(PackSpecQuery::new("uptime", "uptime", 60));
        pack.targets.labels.push("All Hosts".to_string());

        let group = SpecGroup {
            queries: vec![query("uptime")],
            labels: vec![label("All Hosts")],
            packs: vec![pack],
        };
        apply_specs(&mut conn, &group).unwrap();

        assert_eq!(get_specs(&mut conn).unwrap(), group);
    }

    #[test]
    fn test_invalid_spec_names_the_pack() {
        let mut conn = db::open_in_memory().unwrap();

        let mut pack = PackSpec::new("base");
        let mut q = PackSpecQuery::new("uptime", "uptime", 60);
        q.shard = Some(101);
        pack.queries.push(q);

        let err = apply_pack_specs(&mut conn, &[pack]).unwrap_err();
        assert!(matches!(err, Error::ApplySpec { kind: "pack", .. }));
        assert!(matches!(err.root(), Error::InvalidSpec(_)));
    }

    #[test]
    fn test_unknown_host_target() {
        let mut conn = db::open_in_memory().unwrap();

        let mut pack = PackSpec::new("base");
        pack.targets.hosts.push("ghost".to_string());

        let err = apply_pack_specs(&mut conn, &[pack]).unwrap_err();
        assert!(matches!(
            err.root(),
            Error::UnknownHost { host, pack } if host == "ghost" && pack == "base"
        ));
        assert!(Pack::find_by_name(&conn, "base").unwrap().is_none());
    }

    #[test]
    fn test_failed_query_batch_rolls_back() {
        let mut conn = db::open_in_memory().unwrap();

        let err = apply_query_specs(&mut conn, &[query("uptime"), query("")]).unwrap_err();
        assert!(matches!(err.root(), Error::InvalidSpec(_)));
        assert!(get_query_specs(&conn).unwrap().is_empty());
    }
}
