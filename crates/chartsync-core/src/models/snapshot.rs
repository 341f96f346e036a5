//! Patient snapshot models.
//!
//! A [`PatientSnapshot`] is the full set of fields extracted for one patient
//! at one point in time. It is produced fresh on every check and never
//! persisted in full — only its fingerprint survives a run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;

/// Status of a booked future appointment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    /// Slot is live, patient is expected
    Expected,
    /// Slot was collapsed to a placeholder duration by the front desk
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Expected => "Expected",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

/// A single upcoming appointment as reported by the clinical source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Raw date string as stored by the source (multiple formats occur)
    pub date: String,
    /// Branch / location name
    pub branch: Option<String>,
    /// Doctor the patient is booked with
    pub doctor: Option<String>,
    /// Free-text scheduling comment
    pub comment: Option<String>,
    pub status: AppointmentStatus,
}

impl Appointment {
    /// Parsed appointment date, if the raw string is recognizable.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        dates::parse_flexible(&self.date)
    }
}

/// One line of a treatment plan (service, quantity, unit price).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanLine {
    pub service: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl PlanLine {
    pub fn total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// A treatment plan: either a preliminary (complex) proposal or an
/// approved plan tied to a concrete visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentPlan {
    /// Display title, e.g. "Orthodontics (Main branch)"
    pub title: String,
    /// Visit date for approved plans, absent for preliminary ones
    pub date: Option<String>,
    /// Doctor who ran the visit, if known
    pub doctor: Option<String>,
    pub lines: Vec<PlanLine>,
}

impl TreatmentPlan {
    pub fn total(&self) -> f64 {
        self.lines.iter().map(PlanLine::total).sum()
    }
}

/// Full per-patient extraction result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSnapshot {
    /// Stable clinic-assigned patient code
    pub pcode: String,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub phones: Vec<String>,
    pub email: Option<String>,
    /// Consultant assigned to the patient
    pub consultant: Option<String>,
    pub first_visit_date: Option<NaiveDate>,
    pub first_visit_doctor: Option<String>,
    /// Age bucket, e.g. "Adult" / "Child"
    pub age_status: Option<String>,
    /// Commercial patient classification
    pub type_status: Option<String>,
    /// Latest recorded treatment stage
    pub current_stage: Option<String>,
    pub paid_total: f64,
    pub appointments: Vec<Appointment>,
    pub preliminary_plans: Vec<TreatmentPlan>,
    pub approved_plans: Vec<TreatmentPlan>,
}

impl PatientSnapshot {
    /// Full display name, skipping empty parts.
    pub fn full_name(&self) -> String {
        [&self.last_name, &self.first_name, &self.middle_name]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Number of clinic visits, derived from approved plans.
    pub fn visit_count(&self) -> usize {
        self.approved_plans.len()
    }

    /// Most distant known upcoming-appointment date, across all statuses.
    pub fn latest_appointment_date(&self) -> Option<NaiveDate> {
        self.appointments
            .iter()
            .filter_map(Appointment::parsed_date)
            .max()
    }

    /// Sum of all preliminary plan totals.
    pub fn preliminary_cost(&self) -> f64 {
        self.preliminary_plans.iter().map(TreatmentPlan::total).sum()
    }

    /// Sum of all approved plan totals.
    pub fn approved_cost(&self) -> f64 {
        self.approved_plans.iter().map(TreatmentPlan::total).sum()
    }
}
