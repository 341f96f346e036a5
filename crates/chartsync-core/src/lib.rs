//! ChartSync core: incremental clinical-records synchronization and
//! report aggregation.
//!
//! The system tracks every patient it has ever seen, detects when a
//! patient's extracted record content actually changed, regenerates
//! per-patient chart documents only when needed, and maintains a
//! cumulative management report across runs.
//!
//! ```text
//!                    +----------------+
//!                    |  RunContext    |  dates + optional pcode filter
//!                    +-------+--------+
//!                            |
//!                    +-------v--------+
//!   ClinicalSource ->|  Orchestrator  |-> DocumentRenderer
//!   (extraction)     +-------+--------+   (per-patient charts)
//!                            |
//!              +-------------+--------------+
//!              |             |              |
//!      +-------v-----+ +-----v------+ +-----v------+
//!      | KnownPatient| | CSV export | |  Report    |
//!      |   Store     | |            | |  merge     |
//!      +-------------+ +-----+------+ +-----+------+
//!                            |              |
//!                        +---v--------------v---+
//!                        |     CrmUploader      |
//!                        +----------------------+
//! ```
//!
//! All run-time failures below the run level are recoverable: a cron
//! invocation always finishes, checkpoints its registry per date, and
//! exports whatever it managed to extract.

pub mod config;
pub mod dates;
pub mod export;
pub mod fingerprint;
pub mod models;
pub mod render;
pub mod report;
pub mod run;
pub mod source;
pub mod store;

pub use config::{Settings, UploadMode};
pub use export::{CrmUploader, NoopUploader, OutboxUploader};
pub use render::{DocumentRenderer, TextRenderer};
pub use run::{Orchestrator, RunContext, RunSummary};
pub use source::{ClinicalSource, SqliteSource};
pub use store::KnownPatientStore;

use thiserror::Error;

/// Top-level error for callers that drive the library end to end.
#[derive(Error, Debug)]
pub enum ChartSyncError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("run context error: {0}")]
    Context(#[from] run::ContextError),

    #[error("source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("registry error: {0}")]
    Store(#[from] store::StoreError),

    #[error("render error: {0}")]
    Render(#[from] render::RenderError),

    #[error("report error: {0}")]
    Report(#[from] report::ReportError),

    #[error("export error: {0}")]
    Export(#[from] export::ExportError),

    #[error("upload error: {0}")]
    Upload(#[from] export::UploadError),
}

pub type Result<T> = std::result::Result<T, ChartSyncError>;
