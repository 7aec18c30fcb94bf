// src/db/models/mod.rs

//! Data models for fleetpack database entities
//!
//! One struct per table, with the statements that read and write it. The
//! reconciler and the target resolver compose these; they never embed SQL
//! for these tables themselves except for the targeting joins.

mod host;
mod label;
mod label_query_execution;
mod pack;
mod pack_target;
mod query;
mod scheduled_query;

pub use host::Host;
pub use label::Label;
pub use label_query_execution::LabelQueryExecution;
pub use pack::Pack;
pub use pack_target::PackTarget;
pub use query::Query;
pub use scheduled_query::ScheduledQuery;

pub(crate) use label::COLUMNS as LABEL_COLUMNS;
pub(crate) use pack::COLUMNS as PACK_COLUMNS;
