//! CSV export files.
//!
//! Two files per run: the medical export (the full report-row region) and
//! a restricted personal-data export. Semicolon-delimited, matching what
//! the CRM import expects.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::models::{PersonalRow, ReportRow, PERSONAL_COLUMNS, REPORT_COLUMNS};

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

const DELIMITER: char = ';';

/// Escape a CSV field, handling delimiters, quotes and newlines.
fn escape_csv(field: &str) -> String {
    if field.contains(DELIMITER) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_table(path: &Path, header: &[&str], rows: Vec<Vec<String>>) -> ExportResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut out = String::new();
    out.push_str(
        &header
            .iter()
            .map(|h| escape_csv(h))
            .collect::<Vec<_>>()
            .join(&DELIMITER.to_string()),
    );
    out.push('\n');
    for row in rows {
        out.push_str(
            &row.iter()
                .map(|c| escape_csv(c))
                .collect::<Vec<_>>()
                .join(&DELIMITER.to_string()),
        );
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

/// Write the medical export CSV.
pub fn write_medical_csv(path: &Path, rows: &[ReportRow]) -> ExportResult<()> {
    write_table(
        path,
        &REPORT_COLUMNS,
        rows.iter().map(ReportRow::to_strings).collect(),
    )
}

/// Write the personal-data export CSV.
pub fn write_personal_csv(path: &Path, rows: &[PersonalRow]) -> ExportResult<()> {
    write_table(
        path,
        &PERSONAL_COLUMNS,
        rows.iter().map(PersonalRow::to_strings).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EMPTY_MARK;
    use tempfile::TempDir;

    fn row(name: &str) -> ReportRow {
        ReportRow {
            lead_name: name.into(),
            last_name: "Smith".into(),
            first_name: "John".into(),
            middle_name: EMPTY_MARK.into(),
            age: "34".into(),
            consultant: EMPTY_MARK.into(),
            patient_type: "Adult".into(),
            patient_category: EMPTY_MARK.into(),
            first_visit_doctor: EMPTY_MARK.into(),
            first_visit_date: "10.01.2024".into(),
            visit_count: "1".into(),
            next_appointment: "01.02.2024, Main; Dr. Wu".into(),
            preliminary_cost: 0.0,
            approved_cost: 220.0,
            paid_amount: 110.0,
            plan_percent: 50,
            stage: "In treatment".into(),
        }
    }

    #[test]
    fn test_escape_rules() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a;b"), "\"a;b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_medical_csv_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("medical.csv");
        write_medical_csv(&path, &[row("Smith John")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Lead name;Last name;First name"));
        let data = lines.next().unwrap();
        // the embedded semicolon forces quoting
        assert!(data.contains("\"01.02.2024, Main; Dr. Wu\""));
        assert!(data.contains("220.00"));
        assert!(data.contains("50%"));
    }

    #[test]
    fn test_personal_csv_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("personal.csv");
        let rows = vec![PersonalRow {
            last_name: "Smith".into(),
            first_name: "John".into(),
            middle_name: "".into(),
            birth_date: "01.07.1990".into(),
            phone: "111, 222".into(),
            email: "".into(),
            address: "1 Main St".into(),
        }];
        write_personal_csv(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("Last name;First name;Middle name"));
        assert!(content.contains("111, 222"));
    }
}
