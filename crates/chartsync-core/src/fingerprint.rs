//! Content fingerprinting for change detection.
//!
//! A fingerprint is a SHA-256 digest over a canonical projection of the
//! snapshot fields the downstream report actually cares about. The
//! projection is an explicit, fixed field list — never "all fields
//! present" — so optional columns appearing or disappearing upstream
//! cannot flip the digest on their own.
//!
//! Determinism rules:
//! - keys are serialized in lexicographic order (`BTreeMap`);
//! - list-valued fields are coerced element-wise and sorted, so source
//!   row ordering never matters;
//! - absent values map to a NULL token that no real value can produce.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::models::{PatientSnapshot, TreatmentPlan};

/// Token for absent values. NUL cannot occur in extracted text, so the
/// token is distinct from any real value, including the string "null".
pub const NULL_TOKEN: &str = "\u{0}";

/// Compute the fingerprint of a snapshot.
///
/// Pure function: no I/O, never fails. Identical canonical field values
/// always yield an identical digest regardless of source field ordering.
pub fn fingerprint(snapshot: &PatientSnapshot) -> String {
    let fields = canonical_fields(snapshot);
    // BTreeMap keys serialize sorted, giving a stable byte stream
    let payload = serde_json::to_string(&fields)
        .unwrap_or_else(|_| format!("{:?}", fields));
    hash_data(payload.as_bytes())
}

/// Compute SHA-256 hash of data.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Project a snapshot onto the fixed list of tracked fields.
pub fn canonical_fields(snapshot: &PatientSnapshot) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    fields.insert("full_name".into(), coerce_str(&snapshot.full_name()));
    fields.insert(
        "birth_date".into(),
        coerce_opt(snapshot.birth_date.map(|d| d.to_string())),
    );
    fields.insert("address".into(), coerce_opt(snapshot.address.clone()));
    fields.insert("phones".into(), coerce_list(snapshot.phones.clone()));
    fields.insert("email".into(), coerce_opt(snapshot.email.clone()));
    fields.insert("consultant".into(), coerce_opt(snapshot.consultant.clone()));
    fields.insert(
        "first_visit_date".into(),
        coerce_opt(snapshot.first_visit_date.map(|d| d.to_string())),
    );
    fields.insert(
        "first_visit_doctor".into(),
        coerce_opt(snapshot.first_visit_doctor.clone()),
    );
    fields.insert("age_status".into(), coerce_opt(snapshot.age_status.clone()));
    fields.insert("type_status".into(), coerce_opt(snapshot.type_status.clone()));
    fields.insert(
        "current_stage".into(),
        coerce_opt(snapshot.current_stage.clone()),
    );
    fields.insert("visit_count".into(), snapshot.visit_count().to_string());
    fields.insert("paid_total".into(), coerce_amount(snapshot.paid_total));

    let appointments: Vec<String> = snapshot
        .appointments
        .iter()
        .map(|a| {
            // Dates normalize to ISO so format drift upstream is not a change
            let date = a
                .parsed_date()
                .map(|d| d.to_string())
                .unwrap_or_else(|| a.date.clone());
            format!(
                "{}|{}|{}|{}|{}",
                date,
                coerce_opt(a.branch.clone()),
                coerce_opt(a.doctor.clone()),
                coerce_opt(a.comment.clone()),
                a.status.as_str(),
            )
        })
        .collect();
    fields.insert("appointments".into(), coerce_list(appointments));

    fields.insert(
        "preliminary_plans".into(),
        coerce_list(snapshot.preliminary_plans.iter().map(coerce_plan).collect()),
    );
    fields.insert(
        "approved_plans".into(),
        coerce_list(snapshot.approved_plans.iter().map(coerce_plan).collect()),
    );

    fields
}

fn coerce_plan(plan: &TreatmentPlan) -> String {
    let mut lines: Vec<String> = plan
        .lines
        .iter()
        .map(|l| {
            format!(
                "{}*{}*{}",
                coerce_str(&l.service),
                coerce_amount(l.quantity),
                coerce_amount(l.unit_price)
            )
        })
        .collect();
    lines.sort();
    format!(
        "{}|{}|{}|{}|{}",
        coerce_str(&plan.title),
        coerce_opt(plan.date.clone()),
        coerce_opt(plan.doctor.clone()),
        coerce_amount(plan.total()),
        lines.join(";"),
    )
}

fn coerce_str(value: &str) -> String {
    if value.is_empty() {
        NULL_TOKEN.to_string()
    } else {
        value.to_string()
    }
}

fn coerce_opt(value: Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => NULL_TOKEN.to_string(),
    }
}

fn coerce_amount(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        NULL_TOKEN.to_string()
    }
}

fn coerce_list(mut items: Vec<String>) -> String {
    items.sort();
    if items.is_empty() {
        NULL_TOKEN.to_string()
    } else {
        items.join("\n")
    }
}
