//! Known-patient registry persistence.
//!
//! One JSON object keyed by pcode, loaded at run start and checkpointed
//! after every processed date. A corrupt or missing file is a recoverable
//! condition: the run starts from an empty registry.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::models::KnownPatientEntry;

/// Registry persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The in-memory registry shape. BTreeMap keeps the persisted file diffable.
pub type Registry = BTreeMap<String, KnownPatientEntry>;

/// File-backed known-patient store.
pub struct KnownPatientStore {
    path: PathBuf,
}

impl KnownPatientStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read persisted state. Missing storage yields an empty registry;
    /// unreadable storage is logged and also yields an empty registry.
    pub fn load(&self) -> Registry {
        if !self.path.exists() {
            return Registry::new();
        }
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(registry) => registry,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e,
                          "registry unreadable, starting from empty state");
                    Registry::new()
                }
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e,
                      "registry unreadable, starting from empty state");
                Registry::new()
            }
        }
    }

    /// Atomically replace persisted state with the given registry.
    ///
    /// The content is written to a sibling temp file and renamed into
    /// place, so a crash mid-write cannot leave a truncated registry.
    pub fn save(&self, registry: &Registry) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_string_pretty(registry)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
