// src/service.rs

//! Logged entry points over one database connection.
//!
//! [`Service`] is what the binary (and any embedding server) calls. Each
//! method runs one reconciler or resolver operation and emits a single
//! event carrying the method name, how long it took and, on failure, the
//! error. Successful calls log at debug, failures at warn.

use crate::config::Config;
use crate::db::models::{Host, Label, LabelQueryExecution, Pack, Query};
use crate::db::{self, ListOptions};
use crate::error::{Error, Result};
use crate::reconcile;
use crate::spec::{LabelSpec, PackSpec, QuerySpec, SpecGroup};
use crate::targeting::{self, HostId, PackId};
use rusqlite::Connection;
use std::time::Instant;
use tracing::{debug, warn};

fn logged<T>(method: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let result = f();
    let took = start.elapsed();

    match &result {
        Ok(_) => debug!(method, ?took, "ok"),
        Err(err) => warn!(method, ?took, err = %err, "failed"),
    }
    result
}

pub struct Service {
    conn: Connection,
}

impl Service {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open the configured database; the schema must already exist
    pub fn open(config: &Config) -> Result<Self> {
        let conn = db::open_with_timeout(config.db_path()?, config.busy_timeout())?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn apply_specs(&mut self, group: &SpecGroup) -> Result<()> {
        logged("apply_specs", || reconcile::apply_specs(&mut self.conn, group))
    }

    pub fn apply_pack_specs(&mut self, specs: &[PackSpec]) -> Result<()> {
        logged("apply_pack_specs", || reconcile::apply_pack_specs(&mut self.conn, specs))
    }

    pub fn apply_query_specs(&mut self, specs: &[QuerySpec]) -> Result<()> {
        logged("apply_query_specs", || reconcile::apply_query_specs(&mut self.conn, specs))
    }

    pub fn apply_label_specs(&mut self, specs: &[LabelSpec]) -> Result<()> {
        logged("apply_label_specs", || reconcile::apply_label_specs(&mut self.conn, specs))
    }

    /// Queries, labels and packs read from one snapshot
    pub fn get_specs(&mut self) -> Result<SpecGroup> {
        logged("get_specs", || reconcile::get_specs(&mut self.conn))
    }

    pub fn get_pack_specs(&mut self) -> Result<Vec<PackSpec>> {
        logged("get_pack_specs", || reconcile::get_pack_specs(&mut self.conn))
    }

    pub fn get_query_specs(&self) -> Result<Vec<QuerySpec>> {
        logged("get_query_specs", || reconcile::get_query_specs(&self.conn))
    }

    pub fn get_label_specs(&self) -> Result<Vec<LabelSpec>> {
        logged("get_label_specs", || reconcile::get_label_specs(&self.conn))
    }

    pub fn list_packs(&self, opts: &ListOptions) -> Result<Vec<Pack>> {
        logged("list_packs", || Pack::list(&self.conn, opts))
    }

    pub fn pack(&self, id: PackId) -> Result<Pack> {
        logged("pack", || Pack::find_by_id(&self.conn, id))
    }

    /// Live pack by name, `NotFound` otherwise
    pub fn pack_by_name(&self, name: &str) -> Result<Pack> {
        logged("pack_by_name", || {
            Pack::find_by_name(&self.conn, name)?.ok_or_else(|| Error::not_found("Pack", name))
        })
    }

    pub fn delete_pack(&self, id: PackId) -> Result<()> {
        logged("delete_pack", || Pack::soft_delete(&self.conn, id))
    }

    pub fn set_pack_disabled(&self, id: PackId, disabled: bool) -> Result<()> {
        logged("set_pack_disabled", || Pack::set_disabled(&self.conn, id, disabled))
    }

    pub fn list_labels(&self, opts: &ListOptions) -> Result<Vec<Label>> {
        logged("list_labels", || Label::list(&self.conn, opts))
    }

    pub fn delete_label(&self, name: &str) -> Result<()> {
        logged("delete_label", || Label::soft_delete_by_name(&self.conn, name))
    }

    /// Hard-delete a query; pack entries scheduling it go with it
    pub fn delete_query(&self, name: &str) -> Result<()> {
        logged("delete_query", || {
            if Query::delete_by_name(&self.conn, name)? {
                Ok(())
            } else {
                Err(Error::not_found("Query", name))
            }
        })
    }

    pub fn host(&self, id: HostId) -> Result<Host> {
        logged("host", || Host::find_by_id(&self.conn, id))
    }

    /// Host by hostname, `NotFound` otherwise
    pub fn host_by_hostname(&self, hostname: &str) -> Result<Host> {
        logged("host_by_hostname", || {
            Host::find_by_hostname(&self.conn, hostname)?
                .ok_or_else(|| Error::not_found("Host", hostname))
        })
    }

    /// Latest result the host reported for each live label
    pub fn label_results_for_host(&self, host_id: HostId) -> Result<Vec<LabelQueryExecution>> {
        logged("label_results_for_host", || {
            LabelQueryExecution::for_host(&self.conn, host_id)
        })
    }

    pub fn hosts_for_pack(&self, pack_id: PackId, opts: &ListOptions) -> Result<Vec<HostId>> {
        logged("hosts_for_pack", || targeting::hosts_for_pack(&self.conn, pack_id, opts))
    }

    pub fn explicit_hosts_for_pack(
        &self,
        pack_id: PackId,
        opts: &ListOptions,
    ) -> Result<Vec<HostId>> {
        logged("explicit_hosts_for_pack", || {
            targeting::explicit_hosts_for_pack(&self.conn, pack_id, opts)
        })
    }

    pub fn packs_for_host(&self, host_id: HostId) -> Result<Vec<Pack>> {
        logged("packs_for_host", || targeting::packs_for_host(&self.conn, host_id))
    }

    pub fn labels_for_pack(&self, pack_id: PackId) -> Result<Vec<Label>> {
        logged("labels_for_pack", || targeting::labels_for_pack(&self.conn, pack_id))
    }
}
