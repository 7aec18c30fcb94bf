// src/lib.rs

//! fleetpack: declarative query packs for a host fleet
//!
//! Operators submit YAML specs for queries, labels and packs. A pack bundles
//! scheduled queries and targets hosts directly or through labels; hosts
//! report which labels they match, and the target resolver turns that into
//! "which hosts run this pack" and "which packs does this host run".
//!
//! # Architecture
//!
//! - Database-first: all state in one SQLite file
//! - Reconciliation: every apply is a single transaction, all or nothing
//! - Soft deletes: packs and labels keep their ids and come back on re-apply
//! - Targeting: set union of explicit hosts and matching label members

pub mod config;
pub mod db;
mod error;
pub mod reconcile;
pub mod service;
pub mod spec;
pub mod targeting;

pub use config::Config;
pub use error::{Error, Result, StoreContext};
pub use service::Service;
pub use spec::{LabelSpec, PackSpec, PackSpecQuery, PackSpecTargets, QuerySpec, SpecGroup};
pub use targeting::{HostId, PackId};
