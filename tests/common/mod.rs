// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use fleetpack::db;
use fleetpack::db::models::{Host, Label, Pack};
use fleetpack::spec::LabelMembership;
use fleetpack::{LabelSpec, PackSpec, PackSpecQuery, QuerySpec};
use rusqlite::{Connection, params};
use tempfile::TempDir;

/// Create an initialized on-disk database.
///
/// Returns (TempDir, db_path) - keep the TempDir alive to prevent cleanup.
pub fn setup_test_db() -> (TempDir, String) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_str()
        .unwrap()
        .to_string();

    db::init(&db_path).unwrap();

    (temp_dir, db_path)
}

pub fn query_spec(name: &str) -> QuerySpec {
    QuerySpec {
        name: name.to_string(),
        description: format!("{name} query"),
        query: format!("SELECT * FROM {name}"),
        platform: None,
        min_version: None,
    }
}

pub fn label_spec(name: &str) -> LabelSpec {
    LabelSpec {
        name: name.to_string(),
        description: String::new(),
        query: format!("SELECT 1 FROM os_version WHERE name = '{name}'"),
        platform: None,
        membership: LabelMembership::Dynamic,
    }
}

/// The fleet used by most tests: three queries, three labels, four hosts
pub struct Fleet {
    pub web1: i64,
    pub web2: i64,
    pub db1: i64,
    pub mac1: i64,
    pub ubuntu: i64,
    pub centos: i64,
    pub macos: i64,
}

pub fn seed_fleet(conn: &mut Connection) -> Fleet {
    fleetpack::reconcile::apply_query_specs(
        conn,
        &[query_spec("uptime"), query_spec("processes"), query_spec("users")],
    )
    .unwrap();
    fleetpack::reconcile::apply_label_specs(
        conn,
        &[label_spec("Ubuntu"), label_spec("CentOS"), label_spec("macOS")],
    )
    .unwrap();

    let web1 = add_host(conn, "web-1");
    let web2 = add_host(conn, "web-2");
    let db1 = add_host(conn, "db-1");
    let mac1 = add_host(conn, "mac-1");

    let ubuntu = label_id(conn, "Ubuntu");
    let centos = label_id(conn, "CentOS");
    let macos = label_id(conn, "macOS");

    record_label_result(conn, web1, ubuntu, true);
    record_label_result(conn, web2, ubuntu, true);
    record_label_result(conn, db1, centos, true);
    record_label_result(conn, db1, ubuntu, false);
    record_label_result(conn, mac1, macos, true);

    Fleet {
        web1,
        web2,
        db1,
        mac1,
        ubuntu,
        centos,
        macos,
    }
}

pub fn add_host(conn: &Connection, hostname: &str) -> i64 {
    Host::new(hostname).insert(conn).unwrap()
}

pub fn label_id(conn: &Connection, name: &str) -> i64 {
    Label::find_by_name(conn, name).unwrap().unwrap().id
}

pub fn pack_id(conn: &Connection, name: &str) -> i64 {
    Pack::find_by_name(conn, name).unwrap().unwrap().id
}

/// Write a label result the way the host-report path does
pub fn record_label_result(conn: &Connection, host_id: i64, label_id: i64, matches: bool) {
    conn.execute(
        "INSERT INTO label_query_executions (host_id, label_id, matches, updated_at)
         VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
         ON CONFLICT(host_id, label_id) DO UPDATE SET
             matches = excluded.matches,
             updated_at = excluded.updated_at",
        params![host_id, label_id, matches],
    )
    .unwrap();
}

/// A pack scheduling `queries` (query name doubles as entry name) against `labels`
pub fn pack_spec(name: &str, queries: &[&str], labels: &[&str]) -> PackSpec {
    let mut spec = PackSpec::new(name);
    spec.description = format!("{name} pack");
    for q in queries {
        spec.queries.push(PackSpecQuery::new(*q, *q, 3600));
    }
    spec.targets.labels = labels.iter().map(|l| l.to_string()).collect();
    spec
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}
