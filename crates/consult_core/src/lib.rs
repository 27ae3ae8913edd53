//! Consultation core: record model, near-duplicate clustering and the pure
//! collector state machine. No IO happens in this crate.
mod cluster;
mod config;
mod crawl_state;
mod effect;
mod graph;
mod msg;
mod normalize;
mod record;
mod shingle;
mod similarity;
mod state;
mod update;
mod view_model;

pub use cluster::{
    cluster_records, cluster_sizes, connected_components, normalize_records, ClusterReport,
};
pub use config::{
    ClusterSettings, CollectorConfig, ConfigError, Threshold, DEFAULT_CHECKPOINT_INTERVAL,
    DEFAULT_MAX_FAILED_BATCHES, DEFAULT_NAME_FIELD, DEFAULT_SHINGLE_SIZE, DEFAULT_THRESHOLD,
};
pub use crawl_state::{CrawlState, MergeStats, StateError};
pub use effect::{Effect, StopReason};
pub use graph::{similarity_edges, Edge};
pub use msg::{FetchFailure, ListingPage, Msg};
pub use normalize::canonical_text;
pub use record::{ClusterId, Record};
pub use shingle::{shingle, Shingle, ShingleSet};
pub use similarity::jaccard;
pub use state::{CollectorState, Phase};
pub use update::update;
pub use view_model::{CollectorStats, CollectorView};
