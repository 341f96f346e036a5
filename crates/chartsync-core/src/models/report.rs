//! Display-row shapes consumed by the CSV export and the aggregate report.

use serde::{Deserialize, Serialize};

/// Column headers of the medical export and the aggregate report data
/// region, in order. `ReportRow::to_strings` must stay aligned with this.
pub const REPORT_COLUMNS: [&str; 17] = [
    "Lead name",
    "Last name",
    "First name",
    "Middle name",
    "Age",
    "Consultant",
    "Patient type",
    "Patient category",
    "First visit doctor",
    "First visit date",
    "Visit count",
    "Next appointment",
    "Preliminary plans cost",
    "Approved plans cost",
    "Paid amount",
    "Plan completion %",
    "Stage",
];

/// Placeholder for missing display values.
pub const EMPTY_MARK: &str = "—";

/// Next-appointment text when every known slot was cancelled.
pub const CANCELLED_MARK: &str = "Appointment cancelled";

/// Stage bucket for patients with no live future booking.
pub const NO_BOOKINGS_STAGE: &str = "No bookings";

/// One display row for a patient, keyed by `lead_name` when merged into
/// the aggregate report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRow {
    /// Full display name — the merge identity key
    pub lead_name: String,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub age: String,
    pub consultant: String,
    pub patient_type: String,
    pub patient_category: String,
    pub first_visit_doctor: String,
    pub first_visit_date: String,
    pub visit_count: String,
    /// Summary of the next expected appointment, or the empty mark
    pub next_appointment: String,
    pub preliminary_cost: f64,
    pub approved_cost: f64,
    pub paid_amount: f64,
    /// Rounded whole percent of the approved cost already paid
    pub plan_percent: u32,
    /// Stage bucket used by the breakdown block
    pub stage: String,
}

impl ReportRow {
    /// Row cells as display strings, aligned with [`REPORT_COLUMNS`].
    pub fn to_strings(&self) -> Vec<String> {
        vec![
            self.lead_name.clone(),
            self.last_name.clone(),
            self.first_name.clone(),
            self.middle_name.clone(),
            self.age.clone(),
            self.consultant.clone(),
            self.patient_type.clone(),
            self.patient_category.clone(),
            self.first_visit_doctor.clone(),
            self.first_visit_date.clone(),
            self.visit_count.clone(),
            self.next_appointment.clone(),
            format!("{:.2}", self.preliminary_cost),
            format!("{:.2}", self.approved_cost),
            format!("{:.2}", self.paid_amount),
            format!("{}%", self.plan_percent),
            self.stage.clone(),
        ]
    }

    /// True when the row carries a live next appointment.
    pub fn has_next_appointment(&self) -> bool {
        self.next_appointment != EMPTY_MARK && !self.next_appointment.is_empty()
    }
}

/// Personal-data row for the separate restricted CSV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonalRow {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub birth_date: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

/// Column headers of the personal-data export.
pub const PERSONAL_COLUMNS: [&str; 7] = [
    "Last name",
    "First name",
    "Middle name",
    "Birth date",
    "Phone",
    "Email",
    "Address",
];

impl PersonalRow {
    pub fn to_strings(&self) -> Vec<String> {
        vec![
            self.last_name.clone(),
            self.first_name.clone(),
            self.middle_name.clone(),
            self.birth_date.clone(),
            self.phone.clone(),
            self.email.clone(),
            self.address.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_strings_match_columns() {
        let row = ReportRow {
            lead_name: "Smith John".into(),
            last_name: "Smith".into(),
            first_name: "John".into(),
            middle_name: EMPTY_MARK.into(),
            age: "34".into(),
            consultant: EMPTY_MARK.into(),
            patient_type: "Adult".into(),
            patient_category: EMPTY_MARK.into(),
            first_visit_doctor: EMPTY_MARK.into(),
            first_visit_date: "10.01.2024".into(),
            visit_count: "2".into(),
            next_appointment: EMPTY_MARK.into(),
            preliminary_cost: 100.0,
            approved_cost: 250.5,
            paid_amount: 100.0,
            plan_percent: 40,
            stage: "In treatment".into(),
        };
        let cells = row.to_strings();
        assert_eq!(cells.len(), REPORT_COLUMNS.len());
        assert_eq!(cells[13], "250.50");
        assert_eq!(cells[15], "40%");
        assert!(!row.has_next_appointment());
    }
}
