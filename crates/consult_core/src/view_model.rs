use crate::cluster::ClusterReport;
use crate::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectorStats {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub items_fetched: usize,
    pub items_failed: usize,
    /// Listing entries that were already known (or repeated on the page).
    pub items_skipped: usize,
    pub checkpoints: usize,
}

/// Read-only snapshot of a run, for progress logging and the final summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorView {
    pub phase: Phase,
    pub page: u32,
    pub last_page: Option<u32>,
    pub records: usize,
    pub batches: usize,
    pub stats: CollectorStats,
    pub report: Option<ClusterReport>,
}
