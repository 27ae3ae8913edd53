use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use consult_core::{CrawlState, Record};
use consult_logging::consult_debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("state file {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("state file {} has version {found}, expected {}", .path.display(), STATE_VERSION)]
    Version { path: PathBuf, found: u32 },
    #[error("cannot serialize state: {0}")]
    Serialize(String),
    #[error("cannot write state: {0}")]
    Write(#[from] PersistError),
}

/// Keyed persistence of the accumulated crawl state.
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing was persisted yet.
    fn load(&self) -> Result<Option<CrawlState>, StoreError>;
    fn save(&self, state: &CrawlState) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    version: u32,
    records: Vec<Record>,
}

/// State kept as one pretty-printed RON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct RonStateStore {
    path: PathBuf,
    writer: AtomicFileWriter,
    filename: String,
}

impl RonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.ron".to_string());
        Self {
            writer: AtomicFileWriter::new(dir),
            path,
            filename,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl ToString) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl StateStore for RonStateStore {
    fn load(&self) -> Result<Option<CrawlState>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let persisted: PersistedState = ron::from_str(&content).map_err(|err| self.corrupt(err))?;
        if persisted.version != STATE_VERSION {
            return Err(StoreError::Version {
                path: self.path.clone(),
                found: persisted.version,
            });
        }
        let state = CrawlState::from_records(persisted.records).map_err(|err| self.corrupt(err))?;
        consult_debug!("loaded {} records from {}", state.len(), self.path.display());
        Ok(Some(state))
    }

    fn save(&self, state: &CrawlState) -> Result<(), StoreError> {
        let persisted = PersistedState {
            version: STATE_VERSION,
            records: state.records().to_vec(),
        };
        let content = ron::ser::to_string_pretty(&persisted, ron::ser::PrettyConfig::new())
            .map_err(|err| StoreError::Serialize(err.to_string()))?;
        self.writer.write(&self.filename, &content)?;
        consult_debug!("saved {} records to {}", state.len(), self.path.display());
        Ok(())
    }
}
