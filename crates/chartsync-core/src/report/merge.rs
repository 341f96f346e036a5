//! Merge freshly extracted rows into the persisted aggregate report.
//!
//! The data region is upserted by lead name: a known patient's row is
//! replaced in place, an unknown one is appended. The breakdown and
//! summary blocks below the data region are derived, so they are thrown
//! away and rebuilt on every merge. The operation is idempotent.

use std::collections::BTreeSet;

use crate::models::{ReportRow, CANCELLED_MARK, EMPTY_MARK, NO_BOOKINGS_STAGE, REPORT_COLUMNS};
use crate::report::formula;
use crate::report::sheet::{CellValue, ReportDocument, SheetFormat};

/// 1-based spreadsheet columns of the report layout.
const ORDINAL_COL: usize = 1;
const IDENTITY_COL: usize = 2;
const PATIENT_TYPE_COL: usize = 8;
const NEXT_APPT_COL: usize = 13;
const PAID_COL: usize = 16;
const STAGE_COL: usize = 18;

const DOC_WIDTH: usize = REPORT_COLUMNS.len() + 1;

const BREAKDOWN_SENTINEL: &str = "Breakdown:";
const SUMMARY_SENTINEL: &str = "Summary";

const PATIENT_TYPE_LABELS: [&str; 2] = ["Adult", "Child"];

/// True for rows belonging to the upsertable data region: a formula
/// ordinal in the first column and a patient name in the identity column.
fn is_data_row(row: &[CellValue]) -> bool {
    matches!(row.first(), Some(CellValue::Formula(_)) | Some(CellValue::Number(_)))
        && row
            .get(IDENTITY_COL - 1)
            .map(|cell| cell.as_text().is_some() && !cell.is_empty())
            .unwrap_or(false)
}

fn data_cells(row: &ReportRow, sheet_row: usize) -> Vec<CellValue> {
    vec![
        CellValue::formula(formula::ordinal(IDENTITY_COL, sheet_row)),
        CellValue::text(row.lead_name.clone()),
        CellValue::text(row.last_name.clone()),
        CellValue::text(row.first_name.clone()),
        CellValue::text(row.middle_name.clone()),
        CellValue::text(row.age.clone()),
        CellValue::text(row.consultant.clone()),
        CellValue::text(row.patient_type.clone()),
        CellValue::text(row.patient_category.clone()),
        CellValue::text(row.first_visit_doctor.clone()),
        CellValue::text(row.first_visit_date.clone()),
        CellValue::text(row.visit_count.clone()),
        CellValue::text(row.next_appointment.clone()),
        CellValue::number(row.preliminary_cost),
        CellValue::number(row.approved_cost),
        CellValue::number(row.paid_amount),
        CellValue::text(format!("{}%", row.plan_percent)),
        CellValue::text(row.stage.clone()),
    ]
}

/// Stage labels for the breakdown: every stage present in the data plus
/// the no-bookings bucket, stable order.
fn stage_labels(data: &[Vec<CellValue>]) -> Vec<String> {
    let mut labels: BTreeSet<String> = data
        .iter()
        .filter_map(|row| row.get(STAGE_COL - 1).and_then(CellValue::as_text))
        .filter(|s| !s.trim().is_empty() && *s != EMPTY_MARK)
        .map(str::to_string)
        .collect();
    labels.insert(NO_BOOKINGS_STAGE.to_string());
    labels.into_iter().collect()
}

fn label_row(label: &str, formula_text: String) -> Vec<CellValue> {
    vec![CellValue::text(label), CellValue::formula(formula_text)]
}

/// Merge `incoming` into `existing` (or a fresh document titled `title`)
/// and return the rebuilt report.
pub fn merge_rows(
    existing: Option<ReportDocument>,
    incoming: &[ReportRow],
    title: &str,
) -> ReportDocument {
    let doc = existing.unwrap_or_else(|| ReportDocument::new_with_header(title));

    // Everything below the data region is derived; drop it
    let mut data: Vec<Vec<CellValue>> = doc
        .rows
        .iter()
        .skip(1)
        .filter(|row| is_data_row(row))
        .cloned()
        .collect();

    for row in incoming {
        let cells = data_cells(row, 0); // ordinal rewritten below
        match data.iter().position(|existing| {
            existing.get(IDENTITY_COL - 1).and_then(CellValue::as_text) == Some(&row.lead_name)
        }) {
            Some(index) => data[index] = cells,
            None => data.push(cells),
        }
    }

    let mut header = vec![CellValue::text("#")];
    header.extend(REPORT_COLUMNS.iter().map(|c| CellValue::text(*c)));

    let mut rows = vec![header];
    for (i, mut cells) in data.into_iter().enumerate() {
        let sheet_row = i + 2;
        cells[ORDINAL_COL - 1] = CellValue::formula(formula::ordinal(IDENTITY_COL, sheet_row));
        rows.push(cells);
    }

    let first_data_row = 2;
    let last_data_row = rows.len(); // header is row 1
    let has_data = last_data_row >= first_data_row;

    if has_data {
        let labels = stage_labels(&rows[1..]);

        rows.push(Vec::new());
        rows.push(vec![CellValue::text(BREAKDOWN_SENTINEL)]);
        for label in PATIENT_TYPE_LABELS {
            rows.push(label_row(
                label,
                formula::visible_label_count(PATIENT_TYPE_COL, first_data_row, last_data_row, label),
            ));
        }
        for label in &labels {
            rows.push(label_row(
                label,
                formula::visible_label_count(STAGE_COL, first_data_row, last_data_row, label),
            ));
        }

        rows.push(Vec::new());
        rows.push(vec![CellValue::text(SUMMARY_SENTINEL)]);

        let patients_row = rows.len() + 1;
        rows.push(label_row(
            "Patients",
            formula::visible_count(IDENTITY_COL, first_data_row, last_data_row),
        ));

        let with_next_row = rows.len() + 1;
        rows.push(label_row(
            "With next appointment",
            formula::visible_excluding_count(
                NEXT_APPT_COL,
                first_data_row,
                last_data_row,
                &[EMPTY_MARK, CANCELLED_MARK, ""],
            ),
        ));

        rows.push(label_row(
            "Conversion %",
            formula::guarded_percent(
                &format!("B{}", with_next_row),
                &format!("B{}", patients_row),
            ),
        ));

        let total_paid_row = rows.len() + 1;
        rows.push(label_row(
            "Total paid",
            formula::visible_sum(PAID_COL, first_data_row, last_data_row),
        ));

        rows.push(label_row(
            "Average paid",
            formula::guarded_ratio(
                &format!("B{}", total_paid_row),
                &format!("B{}", patients_row),
            ),
        ));
    }

    let format = SheetFormat {
        bold_header: true,
        wrap_text: true,
        column_widths: column_widths(&rows),
        date_columns: vec![10], // first visit date
        auto_filter: has_data.then(|| {
            format!("A1:{}{}", formula::col_letter(DOC_WIDTH), last_data_row)
        }),
        freeze_at: Some("A2".to_string()),
    };

    ReportDocument {
        title: title.to_string(),
        rows,
        format,
    }
}

const MIN_COLUMN_WIDTH: f64 = 6.0;

/// Width per column from the widest literal cell, plus padding. Formula
/// cells are skipped: their display value is not known here.
fn column_widths(rows: &[Vec<CellValue>]) -> Vec<f64> {
    let mut widths = vec![MIN_COLUMN_WIDTH; DOC_WIDTH];
    for row in rows {
        for (i, cell) in row.iter().take(DOC_WIDTH).enumerate() {
            let len = match cell {
                CellValue::Text(s) => s.chars().count(),
                CellValue::Number(n) => format!("{:.2}", n).chars().count(),
                _ => 0,
            };
            widths[i] = widths[i].max((len + 2) as f64);
        }
    }
    widths
}
