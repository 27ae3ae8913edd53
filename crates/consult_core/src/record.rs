use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shingle::ShingleSet;

/// Identifier assigned to one connected component of the similarity graph.
pub type ClusterId = usize;

/// One submission or consultation collected from the source site.
///
/// `identifier` is the source URL and doubles as the primary key across runs.
/// `canonical_text`, `shingles` and `cluster_id` are derived during the
/// finalizing pass; everything else is supplied by the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    pub identifier: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub inline_text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub attachment_text: Option<String>,
    #[serde(default)]
    pub attachment_error: Option<String>,
    #[serde(default)]
    pub canonical_text: Option<String>,
    /// Recomputed on every clustering pass, never persisted.
    #[serde(skip)]
    pub shingles: Option<ShingleSet>,
    #[serde(default)]
    pub cluster_id: Option<ClusterId>,
}

impl Record {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_inline_text(mut self, text: impl Into<String>) -> Self {
        self.inline_text = Some(text.into());
        self
    }

    pub fn with_attachment_text(mut self, text: impl Into<String>) -> Self {
        self.attachment_text = Some(text.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Drops every derived value so the next pass starts from the raw inputs.
    pub fn clear_derived(&mut self) {
        self.canonical_text = None;
        self.shingles = None;
        self.cluster_id = None;
    }
}
