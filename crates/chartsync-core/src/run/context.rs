//! What one invocation covers: which dates, and optionally which patients.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("end date {end} precedes start date {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// Scope of a single run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Dates to process, ascending
    pub dates: Vec<NaiveDate>,
    /// When non-empty, evaluate exactly these pcodes and nothing else
    pub filter: Vec<String>,
}

impl RunContext {
    /// Single-date run.
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            dates: vec![date],
            filter: Vec::new(),
        }
    }

    /// Inclusive date-range run.
    pub fn for_range(start: NaiveDate, end: NaiveDate) -> Result<Self, ContextError> {
        if end < start {
            return Err(ContextError::InvertedRange { start, end });
        }
        let mut dates = Vec::new();
        let mut current = start;
        while current <= end {
            dates.push(current);
            current = current.succ_opt().unwrap_or(current);
            if dates.last() == Some(&end) {
                break;
            }
        }
        Ok(Self {
            dates,
            filter: Vec::new(),
        })
    }

    /// Restrict the run to an explicit patient list.
    pub fn with_filter(mut self, pcodes: Vec<String>) -> Self {
        self.filter = pcodes;
        self
    }
}
