// src/db/list_options.rs

//! Paging and ordering layered on top of a base SELECT.
//!
//! The base query is wrapped as a subquery, so the order key refers to the
//! base query's output columns and never to an ambiguous joined column.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Row limit used when `per_page` is 0
pub const DEFAULT_PER_PAGE: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Zero-based page number
    #[serde(default)]
    pub page: u32,

    /// Rows per page; 0 means [`DEFAULT_PER_PAGE`]
    #[serde(default)]
    pub per_page: u32,

    /// Output column to order by
    #[serde(default)]
    pub order_key: Option<String>,

    #[serde(default)]
    pub order_direction: OrderDirection,
}

impl ListOptions {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, key: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_key = Some(key.into());
        self.order_direction = direction;
        self
    }

    /// Wrap `base` with ORDER BY / LIMIT / OFFSET
    pub fn apply_to_sql(&self, base: &str) -> Result<String> {
        let mut sql = format!("SELECT * FROM ({base})");

        if let Some(key) = &self.order_key {
            validate_order_key(key)?;
            sql.push_str(&format!(" ORDER BY {} {}", key, self.order_direction.as_sql()));
        }

        let per_page = if self.per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            self.per_page
        };
        let offset = u64::from(self.page) * u64::from(per_page);
        sql.push_str(&format!(" LIMIT {per_page} OFFSET {offset}"));

        Ok(sql)
    }
}

/// Order keys are interpolated into SQL, so only plain identifiers pass
fn validate_order_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid order key: {key:?}")))
    }
}
