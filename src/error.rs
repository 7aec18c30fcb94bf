// src/error.rs

//! Error types for fleetpack
//!
//! Reference failures (unknown query, label or host) are kept apart from
//! store failures so callers can report them as bad input rather than as
//! infrastructure problems.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Raw SQLite failure without extra context
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// SQLite failure annotated with the step that produced it
    #[error("{context}: {source}")]
    StoreError {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Lookup by id for a row that is absent or soft-deleted
    #[error("{resource} {id} was not found")]
    NotFound { resource: &'static str, id: String },

    #[error("cannot schedule unknown query '{query}' in pack '{pack}'")]
    UnknownQuery { query: String, pack: String },

    #[error("cannot target unknown label '{label}' in pack '{pack}'")]
    UnknownLabel { label: String, pack: String },

    #[error("cannot target unknown host '{host}' in pack '{pack}'")]
    UnknownHost { host: String, pack: String },

    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single spec of a batch failed; the whole batch was rolled back
    #[error("applying {kind} '{name}': {source}")]
    ApplySpec {
        kind: &'static str,
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// The store returned something that contradicts a write it just accepted
    #[error("Store inconsistency: {0}")]
    Inconsistent(String),
}

impl Error {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Unwrap `ApplySpec` layers down to the failure that caused them
    pub fn root(&self) -> &Error {
        match self {
            Error::ApplySpec { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound { .. })
    }

    /// True for the validation class: the input named something that does not exist
    pub fn is_unknown_reference(&self) -> bool {
        matches!(
            self.root(),
            Error::UnknownQuery { .. } | Error::UnknownLabel { .. } | Error::UnknownHost { .. }
        )
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::ParseError(e.to_string())
    }
}

/// Attach a step description to SQLite errors, e.g. `.context("delete existing targets")`
pub trait StoreContext<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> StoreContext<T> for rusqlite::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| Error::StoreError {
            context: context.into(),
            source,
        })
    }
}
