//! The aggregate management report.
//!
//! The report is a spreadsheet-shaped document persisted as JSON: a data
//! region of one row per patient ever seen, followed by breakdown and
//! summary blocks of live formulas. [`merge::merge_rows`] is the only
//! mutation path.

pub mod formula;
pub mod merge;
mod sheet;

pub use merge::merge_rows;
pub use sheet::{CellValue, ReportDocument, ReportError, ReportResult, SheetFormat};
