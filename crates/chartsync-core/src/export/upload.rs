//! CRM upload hand-off.
//!
//! The core never talks to the CRM directly; it hands the finished
//! artifacts to a [`CrmUploader`]. [`OutboxUploader`] stages them into a
//! directory an external delivery job watches; [`NoopUploader`] disables
//! delivery entirely.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// Upload errors.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("upload failure: {0}")]
    Upload(String),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Paths of the finished run artifacts.
#[derive(Debug, Clone)]
pub struct ExportArtifacts {
    pub medical_csv: PathBuf,
    pub personal_csv: PathBuf,
    pub report_doc: PathBuf,
}

/// Delivers the run artifacts to the CRM side.
pub trait CrmUploader {
    fn upload(&self, artifacts: &ExportArtifacts) -> UploadResult<()>;
}

/// Uploader that does nothing.
#[derive(Debug, Default)]
pub struct NoopUploader;

impl CrmUploader for NoopUploader {
    fn upload(&self, _artifacts: &ExportArtifacts) -> UploadResult<()> {
        info!("upload disabled, leaving artifacts in place");
        Ok(())
    }
}

/// Copies artifacts into an outbox directory for external delivery.
#[derive(Debug)]
pub struct OutboxUploader {
    outbox: PathBuf,
}

impl OutboxUploader {
    pub fn new<P: AsRef<Path>>(outbox: P) -> Self {
        Self {
            outbox: outbox.as_ref().to_path_buf(),
        }
    }

    fn stage(&self, source: &Path) -> UploadResult<()> {
        if !source.exists() {
            // an artifact stage may have failed upstream; deliver the rest
            return Ok(());
        }
        let name = source
            .file_name()
            .ok_or_else(|| UploadError::Upload(format!("bad artifact path: {}", source.display())))?;
        fs::copy(source, self.outbox.join(name))?;
        Ok(())
    }
}

impl CrmUploader for OutboxUploader {
    fn upload(&self, artifacts: &ExportArtifacts) -> UploadResult<()> {
        fs::create_dir_all(&self.outbox)?;
        self.stage(&artifacts.medical_csv)?;
        self.stage(&artifacts.personal_csv)?;
        self.stage(&artifacts.report_doc)?;
        info!(outbox = %self.outbox.display(), "artifacts staged for delivery");
        Ok(())
    }
}
