//! Projection of patient snapshots onto display rows.

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::dates;
use crate::models::{
    Appointment, AppointmentStatus, PatientSnapshot, PersonalRow, ReportRow, CANCELLED_MARK,
    EMPTY_MARK, NO_BOOKINGS_STAGE,
};
use crate::source::ClinicalSource;

fn opt_display(value: &Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.clone(),
        _ => EMPTY_MARK.to_string(),
    }
}

fn age_years(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Human summary of the next live appointment.
///
/// The earliest expected slot wins; when every slot is cancelled the
/// summary says so instead of pretending there is no booking history.
fn next_appointment_summary(appointments: &[Appointment]) -> (String, bool) {
    let mut sorted: Vec<&Appointment> = appointments.iter().collect();
    sorted.sort_by_key(|a| a.parsed_date());

    let mut cancelled_seen = false;
    for appt in sorted {
        match appt.status {
            AppointmentStatus::Cancelled => cancelled_seen = true,
            AppointmentStatus::Expected => {
                let mut summary = dates::display_or_raw(&appt.date);
                if let Some(branch) = &appt.branch {
                    summary.push_str(&format!(", {}", branch));
                }
                if let Some(doctor) = &appt.doctor {
                    summary.push_str(&format!(", {}", doctor));
                }
                if let Some(comment) = &appt.comment {
                    if !comment.trim().is_empty() {
                        summary.push_str(&format!(", Comment: {}", comment.trim()));
                    }
                }
                return (summary, true);
            }
        }
    }
    if cancelled_seen {
        (CANCELLED_MARK.to_string(), false)
    } else {
        (EMPTY_MARK.to_string(), false)
    }
}

/// Build the medical display row for one snapshot.
pub fn project_row(snapshot: &PatientSnapshot, today: NaiveDate) -> ReportRow {
    let (next_appointment, has_live) = next_appointment_summary(&snapshot.appointments);

    let approved_cost = snapshot.approved_cost();
    let plan_percent = if approved_cost > 0.0 {
        (snapshot.paid_total / approved_cost * 100.0).round() as u32
    } else {
        0
    };

    let stage = if has_live {
        opt_display(&snapshot.current_stage)
    } else {
        NO_BOOKINGS_STAGE.to_string()
    };

    ReportRow {
        lead_name: snapshot.full_name(),
        last_name: snapshot.last_name.clone(),
        first_name: snapshot.first_name.clone(),
        middle_name: if snapshot.middle_name.trim().is_empty() {
            EMPTY_MARK.to_string()
        } else {
            snapshot.middle_name.clone()
        },
        age: snapshot
            .birth_date
            .map(|b| age_years(b, today).to_string())
            .unwrap_or_else(|| EMPTY_MARK.to_string()),
        consultant: opt_display(&snapshot.consultant),
        patient_type: opt_display(&snapshot.age_status),
        patient_category: opt_display(&snapshot.type_status),
        first_visit_doctor: opt_display(&snapshot.first_visit_doctor),
        first_visit_date: snapshot
            .first_visit_date
            .map(dates::format_display)
            .unwrap_or_else(|| EMPTY_MARK.to_string()),
        visit_count: snapshot.visit_count().to_string(),
        next_appointment,
        preliminary_cost: snapshot.preliminary_cost(),
        approved_cost,
        paid_amount: snapshot.paid_total,
        plan_percent,
        stage,
    }
}

/// Build the restricted personal-data row for one snapshot.
pub fn project_personal_row(snapshot: &PatientSnapshot) -> PersonalRow {
    PersonalRow {
        last_name: snapshot.last_name.clone(),
        first_name: snapshot.first_name.clone(),
        middle_name: snapshot.middle_name.clone(),
        birth_date: snapshot
            .birth_date
            .map(dates::format_display)
            .unwrap_or_default(),
        phone: snapshot.phones.join(", "),
        email: snapshot.email.clone().unwrap_or_default(),
        address: snapshot.address.clone().unwrap_or_default(),
    }
}

/// Re-extract and project rows for every touched patient. A patient the
/// source can no longer produce is logged and skipped, never fatal.
pub fn collect_rows<S: ClinicalSource + ?Sized>(
    source: &S,
    pcodes: &[String],
    today: NaiveDate,
) -> Vec<ReportRow> {
    let mut rows = Vec::with_capacity(pcodes.len());
    for pcode in pcodes {
        match source.fetch_snapshot(pcode) {
            Ok(Some(snapshot)) => rows.push(project_row(&snapshot, today)),
            Ok(None) => warn!(pcode = %pcode, "patient vanished from source, skipping row"),
            Err(e) => warn!(pcode = %pcode, error = %e, "row extraction failed, skipping"),
        }
    }
    rows
}

/// Personal-data rows for the same touched set, same skip semantics.
pub fn collect_personal_rows<S: ClinicalSource + ?Sized>(
    source: &S,
    pcodes: &[String],
) -> Vec<PersonalRow> {
    let mut rows = Vec::with_capacity(pcodes.len());
    for pcode in pcodes {
        match source.fetch_snapshot(pcode) {
            Ok(Some(snapshot)) => rows.push(project_personal_row(&snapshot)),
            Ok(None) => warn!(pcode = %pcode, "patient vanished from source, skipping row"),
            Err(e) => warn!(pcode = %pcode, error = %e, "row extraction failed, skipping"),
        }
    }
    rows
}
