use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SHINGLE_SIZE: usize = 5;
pub const DEFAULT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;
pub const DEFAULT_MAX_FAILED_BATCHES: usize = 3;
pub const DEFAULT_NAME_FIELD: &str = "Naam";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("shingle size must be at least 1 (got {0})")]
    ShingleSize(usize),
    #[error("similarity threshold must lie in [0, 1] (got {0})")]
    Threshold(f64),
    #[error("checkpoint interval must be at least 1 batch")]
    CheckpointInterval,
    #[error("max failed batches must be at least 1")]
    MaxFailedBatches,
}

/// Inclusive Jaccard threshold, guaranteed to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        // NaN fails the range check as well.
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::Threshold(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn passes(self, similarity: f64) -> bool {
        similarity >= self.0
    }
}

/// Validated parameters of the clustering pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterSettings {
    pub shingle_size: NonZeroUsize,
    pub threshold: Threshold,
}

impl ClusterSettings {
    pub fn new(shingle_size: usize, threshold: f64) -> Result<Self, ConfigError> {
        let shingle_size =
            NonZeroUsize::new(shingle_size).ok_or(ConfigError::ShingleSize(shingle_size))?;
        Ok(Self {
            shingle_size,
            threshold: Threshold::new(threshold)?,
        })
    }
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            shingle_size: NonZeroUsize::new(DEFAULT_SHINGLE_SIZE).unwrap_or(NonZeroUsize::MIN),
            threshold: Threshold(DEFAULT_THRESHOLD),
        }
    }
}

/// User-facing collector options. Passed explicitly into every entry point;
/// call [`CollectorConfig::validate`] before any network activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Keep the respondent name field on collected records.
    pub include_name: bool,
    /// Shingle length `n` in tokens.
    pub n: usize,
    pub threshold: f64,
    /// Number of completed batches between checkpoints.
    pub checkpoint_interval: usize,
    pub download_attachments: bool,
    pub compute_clusters: bool,
    /// Consecutive failed listing batches tolerated before the run fails.
    pub max_failed_batches: usize,
    /// Metadata key holding the respondent name.
    pub name_field: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            include_name: false,
            n: DEFAULT_SHINGLE_SIZE,
            threshold: DEFAULT_THRESHOLD,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            download_attachments: true,
            compute_clusters: true,
            max_failed_batches: DEFAULT_MAX_FAILED_BATCHES,
            name_field: DEFAULT_NAME_FIELD.to_string(),
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<ClusterSettings, ConfigError> {
        let settings = ClusterSettings::new(self.n, self.threshold)?;
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::CheckpointInterval);
        }
        if self.max_failed_batches == 0 {
            return Err(ConfigError::MaxFailedBatches);
        }
        Ok(settings)
    }
}
