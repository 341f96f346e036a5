//! Clinical data source abstraction.
//!
//! The run orchestrator only consumes this trait; the concrete extraction
//! (which database, which queries) sits behind it. [`SqliteSource`] is the
//! bundled reference implementation.

mod sqlite;

pub use sqlite::SqliteSource;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Appointment, PatientSnapshot};

/// Source errors.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection failure: {0}")]
    Connection(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// A patient reported by the daily discovery query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCandidate {
    pub pcode: String,
    pub full_name: String,
}

/// Read-only access to the clinical records system.
pub trait ClinicalSource {
    /// Patients with a primary visit on the given date.
    fn fetch_candidates_for_date(&self, date: NaiveDate) -> SourceResult<Vec<DailyCandidate>>;

    /// Full extraction for one patient; `None` when the pcode is unknown
    /// to the clinical system.
    fn fetch_snapshot(&self, pcode: &str) -> SourceResult<Option<PatientSnapshot>>;

    /// Booked future appointments for one patient.
    fn fetch_upcoming_appointments(&self, pcode: &str) -> SourceResult<Vec<Appointment>>;
}
