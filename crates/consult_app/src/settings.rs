//! Run settings: an optional RON file, then command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use consult_core::{ClusterSettings, CollectorConfig, ConfigError};
use consult_engine::{FetchSettings, Pacing, RetryPolicy, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings file {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("invalid base url {url}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error(transparent)]
    Collector(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    /// State files, attachments and saved pages live under this directory.
    pub data_dir: PathBuf,
    pub collector: CollectorConfig,
    pub save_html: bool,
    pub http: HttpSettings,
    pub retry: RetrySettings,
    pub pacing: PacingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from("data"),
            collector: CollectorConfig::default(),
            save_html: false,
            http: HttpSettings::default(),
            retry: RetrySettings::default(),
            pacing: PacingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_page_bytes: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            max_page_bytes: fetch.max_bytes,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    pub item_delay_ms: u64,
    pub page_delay_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        let pacing = Pacing::default();
        Self {
            item_delay_ms: pacing.item_delay.as_millis() as u64,
            page_delay_ms: pacing.page_delay.as_millis() as u64,
        }
    }
}

/// Values given on the command line; `None` keeps the file or default value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub include_name: Option<bool>,
    pub n: Option<usize>,
    pub threshold: Option<f64>,
    pub checkpoint_interval: Option<usize>,
    pub download_attachments: Option<bool>,
    pub compute_clusters: Option<bool>,
    pub save_html: Option<bool>,
}

impl Settings {
    /// Reads `path` when given; no path means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|err| SettingsError::Parse {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(dir) = overrides.data_dir {
            self.data_dir = dir;
        }
        if let Some(url) = overrides.base_url {
            self.base_url = url;
        }
        let collector = &mut self.collector;
        if let Some(value) = overrides.include_name {
            collector.include_name = value;
        }
        if let Some(value) = overrides.n {
            collector.n = value;
        }
        if let Some(value) = overrides.threshold {
            collector.threshold = value;
        }
        if let Some(value) = overrides.checkpoint_interval {
            collector.checkpoint_interval = value;
        }
        if let Some(value) = overrides.download_attachments {
            collector.download_attachments = value;
        }
        if let Some(value) = overrides.compute_clusters {
            collector.compute_clusters = value;
        }
        if let Some(value) = overrides.save_html {
            self.save_html = value;
        }
    }

    /// Everything that can be wrong without touching the network.
    pub fn validate(&self) -> Result<ClusterSettings, SettingsError> {
        self.base_url()?;
        Ok(self.collector.validate()?)
    }

    pub fn base_url(&self) -> Result<Url, SettingsError> {
        Url::parse(&self.base_url).map_err(|err| SettingsError::BaseUrl {
            url: self.base_url.clone(),
            reason: err.to_string(),
        })
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        let mut fetch = FetchSettings {
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
            max_bytes: self.http.max_page_bytes,
            ..FetchSettings::default()
        };
        if let Some(agent) = &self.http.user_agent {
            fetch.user_agent = agent.clone();
        }
        fetch
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            item_delay: Duration::from_millis(self.pacing.item_delay_ms),
            page_delay: Duration::from_millis(self.pacing.page_delay_ms),
        }
    }

    pub fn responses_state(&self, consultation: &str) -> PathBuf {
        self.data_dir.join(format!("responses_{consultation}.ron"))
    }

    pub fn consultations_state(&self) -> PathBuf {
        self.data_dir.join("consultations.ron")
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.data_dir.join("attachments")
    }

    pub fn html_dir(&self) -> PathBuf {
        self.data_dir.join("html")
    }
}
