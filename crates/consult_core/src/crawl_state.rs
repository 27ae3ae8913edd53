use std::collections::HashSet;

use crate::cluster::{cluster_records, ClusterReport};
use crate::config::ClusterSettings;
use crate::Record;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("duplicate identifier in stored records: {0}")]
    DuplicateIdentifier(String),
}

/// Records collected so far plus the index of their identifiers.
///
/// Invariant: `known` holds exactly the identifiers of `records`, and no
/// identifier appears twice. Records keep first-collected order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrawlState {
    known: HashSet<String>,
    records: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    pub added: usize,
    pub skipped: usize,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds state from persisted records; a repeated identifier means the
    /// stored state is corrupt.
    pub fn from_records(records: Vec<Record>) -> Result<Self, StateError> {
        let mut state = Self::new();
        for record in records {
            if state.known.contains(&record.identifier) {
                return Err(StateError::DuplicateIdentifier(record.identifier));
            }
            state.known.insert(record.identifier.clone());
            state.records.push(record);
        }
        Ok(state)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.known.contains(identifier)
    }

    /// Appends `record` unless its identifier is already known.
    pub fn insert(&mut self, record: Record) -> bool {
        if !self.known.insert(record.identifier.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn merge(&mut self, batch: impl IntoIterator<Item = Record>) -> MergeStats {
        let mut stats = MergeStats::default();
        for record in batch {
            if self.insert(record) {
                stats.added += 1;
            } else {
                stats.skipped += 1;
            }
        }
        stats
    }

    /// Identifiers from `candidates` that are not yet known, deduplicated and
    /// in their original order.
    pub fn unknown<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|id| !self.known.contains(*id) && seen.insert(*id))
            .map(str::to_owned)
            .collect()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Mutable access for derived values. Identifiers must not be edited
    /// through this slice.
    pub(crate) fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Reruns the clustering pass over the stored records, replacing any
    /// previous assignment.
    pub fn recluster(&mut self, settings: &ClusterSettings) -> ClusterReport {
        cluster_records(&mut self.records, settings)
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
