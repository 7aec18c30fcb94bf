// src/db/migrations.rs
//! Database migration implementations
//!
//! Each function handles one schema version upgrade. Version 1 holds the
//! tables owned by other subsystems that fleetpack reads or references
//! (queries, labels, hosts and the label result cache); version 2 adds the
//! pack tables owned by the reconciler.

use crate::error::{Result, StoreContext};
use rusqlite::Connection;
use tracing::{debug, info};

/// Initial schema - Version 1
///
/// - queries: Named query bodies that packs schedule by name
/// - labels: Named host predicates, soft-deletable
/// - hosts: Enrolled hosts (enrollment itself is external)
/// - label_query_executions: Latest per-host label result, written by the host-report path
pub fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE queries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            query TEXT NOT NULL,
            platform TEXT,
            min_version TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        -- Names stay unique across tombstones so re-applying resurrects the row
        CREATE TABLE labels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            query TEXT NOT NULL DEFAULT '',
            platform TEXT,
            membership_type TEXT NOT NULL DEFAULT 'dynamic'
                CHECK(membership_type IN ('dynamic', 'manual')),
            deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX idx_labels_deleted ON labels(deleted);

        CREATE TABLE hosts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hostname TEXT NOT NULL UNIQUE,
            platform TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE label_query_executions (
            host_id INTEGER NOT NULL,
            label_id INTEGER NOT NULL,
            matches INTEGER NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (host_id, label_id),
            FOREIGN KEY (host_id) REFERENCES hosts(id) ON DELETE CASCADE,
            FOREIGN KEY (label_id) REFERENCES labels(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_lqe_label_matches ON label_query_executions(label_id, matches);
        ",
    )
    .context("creating schema version 1")?;

    info!("Schema version 1 created successfully");
    Ok(())
}

/// Schema Version 2: Packs and their owned child collections
///
/// - packs: Named bundles, soft-deletable, with a delivery kill switch (`disabled`)
/// - scheduled_queries: Ordered per-pack schedule referencing queries by name
/// - pack_targets: Polymorphic targets (label or host) per pack
pub fn migrate_v2(conn: &Connection) -> Result<()> {
    debug!("Migrating to schema version 2");

    conn.execute_batch(
        "
        CREATE TABLE packs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            platform TEXT,
            disabled INTEGER NOT NULL DEFAULT 0,
            deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE scheduled_queries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pack_id INTEGER NOT NULL,
            query_name TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            interval INTEGER NOT NULL DEFAULT 0 CHECK(interval >= 0),
            snapshot INTEGER NOT NULL DEFAULT 0,
            removed INTEGER NOT NULL DEFAULT 1,
            shard INTEGER CHECK(shard IS NULL OR shard BETWEEN 0 AND 100),
            platform TEXT,
            version TEXT,
            FOREIGN KEY (pack_id) REFERENCES packs(id) ON DELETE CASCADE,
            FOREIGN KEY (query_name) REFERENCES queries(name) ON DELETE CASCADE
        );

        CREATE INDEX idx_scheduled_queries_pack_id ON scheduled_queries(pack_id);
        CREATE INDEX idx_scheduled_queries_query_name ON scheduled_queries(query_name);

        CREATE TABLE pack_targets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pack_id INTEGER NOT NULL,
            type TEXT NOT NULL CHECK(type IN ('label', 'host')),
            target_id INTEGER NOT NULL,
            UNIQUE(pack_id, type, target_id),
            FOREIGN KEY (pack_id) REFERENCES packs(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_pack_targets_target ON pack_targets(type, target_id);
        ",
    )
    .context("migrating to schema version 2")?;

    info!("Schema version 2 applied successfully");
    Ok(())
}
