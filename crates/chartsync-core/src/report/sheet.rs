//! Spreadsheet-shaped document model.
//!
//! Cells carry either literal values or formula text; the actual
//! spreadsheet file is produced by a downstream converter outside this
//! system. Persistence is JSON with atomic replace, same discipline as
//! the known-patient registry.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::REPORT_COLUMNS;

/// Report persistence errors.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("report document unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;

/// One spreadsheet cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    /// Formula text, stored verbatim starting with `=`
    Formula(String),
}

impl CellValue {
    pub fn text<S: Into<String>>(value: S) -> Self {
        CellValue::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        CellValue::Number(value)
    }

    pub fn formula<S: Into<String>>(value: S) -> Self {
        CellValue::Formula(value.into())
    }

    /// Text content, if the cell holds literal text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
            || matches!(self, CellValue::Text(s) if s.trim().is_empty())
    }
}

/// Presentation metadata the downstream converter applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetFormat {
    pub bold_header: bool,
    pub wrap_text: bool,
    /// Width per column, in character units
    pub column_widths: Vec<f64>,
    /// Zero-based indexes of columns holding display dates
    pub date_columns: Vec<usize>,
    /// Auto-filter over the data region, e.g. "A1:R25"
    pub auto_filter: Option<String>,
    /// Cell reference the panes freeze at
    pub freeze_at: Option<String>,
}

impl Default for SheetFormat {
    fn default() -> Self {
        Self {
            bold_header: true,
            wrap_text: true,
            column_widths: Vec::new(),
            date_columns: Vec::new(),
            auto_filter: None,
            freeze_at: Some("A2".to_string()),
        }
    }
}

/// The persisted report: a titled grid of cells plus formatting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub rows: Vec<Vec<CellValue>>,
    pub format: SheetFormat,
}

impl ReportDocument {
    /// Fresh document holding only the header row.
    pub fn new_with_header(title: &str) -> Self {
        let mut header = vec![CellValue::text("#")];
        header.extend(REPORT_COLUMNS.iter().map(|c| CellValue::text(*c)));
        Self {
            title: title.to_string(),
            rows: vec![header],
            format: SheetFormat::default(),
        }
    }

    /// Load a persisted document. `Ok(None)` when no file exists yet;
    /// a present but unreadable file is an error, never silently replaced.
    pub fn load(path: &Path) -> ReportResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Atomically replace the persisted document.
    pub fn save(&self, path: &Path) -> ReportResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
