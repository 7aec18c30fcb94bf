// src/spec/document.rs

//! Spec documents: the kind-tagged envelope specs travel in.
//!
//! A stream may hold several YAML documents separated by `---`; each one is
//! `{apiVersion, kind, spec}`. [`SpecGroup::parse_yaml`] sorts them by kind.

use super::{LabelSpec, PackSpec, QuerySpec};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The only document version understood
pub const API_VERSION: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecKind {
    Query,
    Label,
    Pack,
}

impl SpecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecKind::Query => "query",
            SpecKind::Label => "label",
            SpecKind::Pack => "pack",
        }
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One document of a spec stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: SpecKind,
    pub spec: serde_yaml::Value,
}

impl SpecDocument {
    fn wrap<T: Serialize>(kind: SpecKind, spec: &T) -> Result<Self> {
        Ok(Self {
            api_version: API_VERSION.to_string(),
            kind,
            spec: serde_yaml::to_value(spec)?,
        })
    }
}

/// Specs of every kind from one submission, each list in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecGroup {
    pub queries: Vec<QuerySpec>,
    pub labels: Vec<LabelSpec>,
    pub packs: Vec<PackSpec>,
}

impl SpecGroup {
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.labels.is_empty() && self.packs.is_empty()
    }

    /// Parse a (possibly multi-document) YAML stream
    pub fn parse_yaml(input: &str) -> Result<Self> {
        let mut group = SpecGroup::default();

        for (index, de) in serde_yaml::Deserializer::from_str(input).enumerate() {
            let Some(doc) = Option::<SpecDocument>::deserialize(de)? else {
                continue;
            };

            if doc.api_version != API_VERSION {
                return Err(Error::ParseError(format!(
                    "document {}: unsupported apiVersion '{}' (expected '{}')",
                    index + 1,
                    doc.api_version,
                    API_VERSION
                )));
            }

            match doc.kind {
                SpecKind::Query => group.queries.push(serde_yaml::from_value(doc.spec)?),
                SpecKind::Label => group.labels.push(serde_yaml::from_value(doc.spec)?),
                SpecKind::Pack => group.packs.push(serde_yaml::from_value(doc.spec)?),
            }
        }

        Ok(group)
    }

    /// Wrap every spec in its document envelope: queries, then labels, then packs
    pub fn documents(&self) -> Result<Vec<SpecDocument>> {
        let mut docs = Vec::new();
        for q in &self.queries {
            docs.push(SpecDocument::wrap(SpecKind::Query, q)?);
        }
        for l in &self.labels {
            docs.push(SpecDocument::wrap(SpecKind::Label, l)?);
        }
        for p in &self.packs {
            docs.push(SpecDocument::wrap(SpecKind::Pack, p)?);
        }
        Ok(docs)
    }

    /// Render as a YAML stream
    pub fn to_yaml(&self) -> Result<String> {
        let mut out = String::new();
        for doc in &self.documents()? {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(doc)?);
        }
        Ok(out)
    }
}
