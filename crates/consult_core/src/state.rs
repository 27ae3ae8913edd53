use std::collections::VecDeque;

use crate::cluster::{cluster_records, normalize_records, ClusterReport};
use crate::config::{ClusterSettings, CollectorConfig, ConfigError};
use crate::view_model::{CollectorStats, CollectorView};
use crate::{CrawlState, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Loading,
    Collecting,
    Finalizing,
    Finished,
    Stopped,
    Failed,
}

/// Single-owner state of one collection run.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorState {
    pub(crate) config: CollectorConfig,
    pub(crate) settings: ClusterSettings,
    pub(crate) phase: Phase,
    pub(crate) crawl: CrawlState,
    /// Listing page of the batch in progress (1-based).
    pub(crate) page: u32,
    /// Bound taken from the first listing page that arrived.
    pub(crate) last_page: Option<u32>,
    pub(crate) pending: VecDeque<String>,
    pub(crate) batches: usize,
    /// New records since the last checkpoint.
    pub(crate) dirty: bool,
    pub(crate) consecutive_failures: usize,
    pub(crate) last_failure: Option<String>,
    pub(crate) stats: CollectorStats,
    pub(crate) report: Option<ClusterReport>,
}

impl CollectorState {
    /// Validates `config`; nothing touches the network before this succeeds.
    pub fn new(config: CollectorConfig) -> Result<Self, ConfigError> {
        let settings = config.validate()?;
        Ok(Self {
            config,
            settings,
            phase: Phase::Loading,
            crawl: CrawlState::new(),
            page: 1,
            last_page: None,
            pending: VecDeque::new(),
            batches: 0,
            dirty: false,
            consecutive_failures: 0,
            last_failure: None,
            stats: CollectorStats::default(),
            report: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn crawl_state(&self) -> &CrawlState {
        &self.crawl
    }

    pub fn into_crawl_state(self) -> CrawlState {
        self.crawl
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn view(&self) -> CollectorView {
        CollectorView {
            phase: self.phase,
            page: self.page,
            last_page: self.last_page,
            records: self.crawl.len(),
            batches: self.batches,
            stats: self.stats.clone(),
            report: self.report.clone(),
        }
    }

    /// Runs the finalizing pass over the entire accumulated set. Only valid
    /// after [`crate::Effect::Finalize`] was emitted; returns the clustering
    /// report when clusters were computed.
    pub fn finalize(&mut self) -> Option<&ClusterReport> {
        if self.phase != Phase::Finalizing {
            return None;
        }
        let records = self.crawl.records_mut();
        if self.config.compute_clusters {
            self.report = Some(cluster_records(records, &self.settings));
        } else {
            normalize_records(records);
        }
        self.phase = Phase::Finished;
        self.report.as_ref()
    }

    /// Applies the privacy filter and keys the record by the identifier the
    /// listing advertised, so a resumed run recognises it.
    pub(crate) fn admit(&self, identifier: String, mut record: Record) -> Record {
        record.identifier = identifier;
        if !self.config.include_name {
            record.fields.remove(&self.config.name_field);
        }
        record.clear_derived();
        record
    }
}
