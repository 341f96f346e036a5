//! Spreadsheet formula text builders.
//!
//! All counting formulas go through SUBTOTAL(103, ...) so rows hidden by
//! the report's auto-filter drop out of every derived figure. Sums use
//! SUBTOTAL(109, ...) for the same reason. Row/column references are
//! 1-based, matching spreadsheet conventions.

/// Spreadsheet column letter for a 1-based column index (1 = A, 27 = AA).
pub fn col_letter(mut index: usize) -> String {
    debug_assert!(index >= 1);
    let mut letters = Vec::new();
    while index > 0 {
        index -= 1;
        letters.push(b'A' + (index % 26) as u8);
        index /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Running ordinal for a data row: counts visible rows from the top of
/// the data region down to this row.
pub fn ordinal(identity_col: usize, row: usize) -> String {
    let c = col_letter(identity_col);
    format!("=SUBTOTAL(103,${c}$2:{c}{row})")
}

/// Count of visible non-empty cells in a column range.
pub fn visible_count(col: usize, first_row: usize, last_row: usize) -> String {
    let c = col_letter(col);
    format!("=SUBTOTAL(103,{c}{first_row}:{c}{last_row})")
}

/// Sum of visible cells in a column range.
pub fn visible_sum(col: usize, first_row: usize, last_row: usize) -> String {
    let c = col_letter(col);
    format!("=SUBTOTAL(109,{c}{first_row}:{c}{last_row})")
}

/// Count of visible rows whose cell in `col` equals `label`.
///
/// SUBTOTAL alone cannot filter by value, so visibility is sampled per
/// row with OFFSET and combined with the label match via SUMPRODUCT.
pub fn visible_label_count(col: usize, first_row: usize, last_row: usize, label: &str) -> String {
    let c = col_letter(col);
    format!(
        "=SUMPRODUCT(SUBTOTAL(103,OFFSET({c}{first_row},ROW({c}{first_row}:{c}{last_row})-ROW({c}{first_row}),0)),--({c}{first_row}:{c}{last_row}=\"{label}\"))"
    )
}

/// Count of visible rows whose cell in `col` is none of `excluded`.
pub fn visible_excluding_count(
    col: usize,
    first_row: usize,
    last_row: usize,
    excluded: &[&str],
) -> String {
    let c = col_letter(col);
    let guards: String = excluded
        .iter()
        .map(|e| format!(",--({c}{first_row}:{c}{last_row}<>\"{e}\")"))
        .collect();
    format!(
        "=SUMPRODUCT(SUBTOTAL(103,OFFSET({c}{first_row},ROW({c}{first_row}:{c}{last_row})-ROW({c}{first_row}),0)){guards})"
    )
}

/// Whole-percent ratio of two cell references, zero when the denominator
/// is zero.
pub fn guarded_percent(numerator_ref: &str, denominator_ref: &str) -> String {
    format!("=IF({denominator_ref}=0,0,ROUND({numerator_ref}/{denominator_ref}*100,0))")
}

/// Ratio of two cell references, zero when the denominator is zero.
pub fn guarded_ratio(numerator_ref: &str, denominator_ref: &str) -> String {
    format!("=IF({denominator_ref}=0,0,{numerator_ref}/{denominator_ref})")
}
