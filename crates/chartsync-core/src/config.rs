//! Runtime configuration.
//!
//! Everything comes from `CHARTSYNC_*` environment variables with working
//! defaults for a local layout, so a bare cron line needs no flags.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown upload mode {0:?} (expected \"outbox\" or \"none\")")]
    UnknownUploadMode(String),
}

/// How finished artifacts leave the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Stage artifacts into the outbox directory
    Outbox,
    /// Leave artifacts where they were written
    None,
}

impl UploadMode {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "outbox" => Ok(UploadMode::Outbox),
            "none" => Ok(UploadMode::None),
            other => Err(ConfigError::UnknownUploadMode(other.to_string())),
        }
    }
}

/// Title of the persisted aggregate report.
pub const REPORT_TITLE: &str = "Management report";

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Clinical source database
    pub db_path: PathBuf,
    /// Known-patient registry file
    pub registry_path: PathBuf,
    /// Rendered per-patient documents
    pub docs_dir: PathBuf,
    /// CSV export directory
    pub csv_dir: PathBuf,
    /// Persisted aggregate report
    pub report_path: PathBuf,
    /// Outbox for CRM delivery
    pub outbox_dir: PathBuf,
    pub upload_mode: UploadMode,
    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/clinic.db"),
            registry_path: PathBuf::from("data/known_patients.json"),
            docs_dir: PathBuf::from("data/docs"),
            csv_dir: PathBuf::from("data/export"),
            report_path: PathBuf::from("data/export/management_report.json"),
            outbox_dir: PathBuf::from("data/outbox"),
            upload_mode: UploadMode::Outbox,
            log_filter: "chartsync=info".to_string(),
        }
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or(default)
}

impl Settings {
    /// Settings from the environment, falling back to defaults per field.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let upload_mode = match env::var("CHARTSYNC_UPLOAD_MODE") {
            Ok(raw) => UploadMode::parse(&raw)?,
            Err(_) => defaults.upload_mode,
        };
        Ok(Self {
            db_path: env_path("CHARTSYNC_DB", defaults.db_path),
            registry_path: env_path("CHARTSYNC_REGISTRY", defaults.registry_path),
            docs_dir: env_path("CHARTSYNC_DOCS_DIR", defaults.docs_dir),
            csv_dir: env_path("CHARTSYNC_CSV_DIR", defaults.csv_dir),
            report_path: env_path("CHARTSYNC_REPORT", defaults.report_path),
            outbox_dir: env_path("CHARTSYNC_OUTBOX", defaults.outbox_dir),
            upload_mode,
            log_filter: env::var("CHARTSYNC_LOG").unwrap_or(defaults.log_filter),
        })
    }

    pub fn medical_csv_path(&self) -> PathBuf {
        self.csv_dir.join("medical_report.csv")
    }

    pub fn personal_csv_path(&self) -> PathBuf {
        self.csv_dir.join("personal_data.csv")
    }
}
