//! Per-patient document rendering.
//!
//! The orchestrator only depends on the [`DocumentRenderer`] trait; the
//! concrete output format is pluggable. [`TextRenderer`] is the bundled
//! implementation, producing a sectioned plain-text chart summary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dates;
use crate::models::{AppointmentStatus, PatientSnapshot, TreatmentPlan};

/// Rendering errors.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("render failure for {pcode}: {message}")]
    Render { pcode: String, message: String },
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Renders one patient snapshot into a document on disk.
pub trait DocumentRenderer {
    /// Where the document for `pcode` lives under `docs_dir`. Used both
    /// to write and to check artifact presence.
    fn artifact_path(&self, docs_dir: &Path, pcode: &str) -> PathBuf;

    /// Produce (or overwrite) the document at `path`.
    fn render(&self, snapshot: &PatientSnapshot, path: &Path) -> RenderResult<()>;
}

/// Plain-text chart summary renderer.
#[derive(Debug, Default)]
pub struct TextRenderer;

impl TextRenderer {
    fn push_plan(out: &mut String, plan: &TreatmentPlan) {
        out.push_str(&format!("  {}\n", plan.title));
        if let Some(date) = &plan.date {
            out.push_str(&format!("    Date: {}\n", dates::display_or_raw(date)));
        }
        if let Some(doctor) = &plan.doctor {
            out.push_str(&format!("    Doctor: {}\n", doctor));
        }
        for line in &plan.lines {
            out.push_str(&format!(
                "    - {} x{:.0} @ {:.2} = {:.2}\n",
                line.service,
                line.quantity,
                line.unit_price,
                line.total()
            ));
        }
        out.push_str(&format!("    Plan total: {:.2}\n", plan.total()));
    }
}

impl DocumentRenderer for TextRenderer {
    fn artifact_path(&self, docs_dir: &Path, pcode: &str) -> PathBuf {
        docs_dir.join(format!("{}.txt", pcode))
    }

    fn render(&self, snapshot: &PatientSnapshot, path: &Path) -> RenderResult<()> {
        let mut out = String::new();

        out.push_str(&format!("PATIENT CHART — {}\n", snapshot.full_name()));
        out.push_str(&format!("Code: {}\n", snapshot.pcode));
        if let Some(birth) = snapshot.birth_date {
            out.push_str(&format!("Born: {}\n", dates::format_display(birth)));
        }
        if let Some(address) = &snapshot.address {
            out.push_str(&format!("Address: {}\n", address));
        }
        if !snapshot.phones.is_empty() {
            out.push_str(&format!("Phones: {}\n", snapshot.phones.join(", ")));
        }
        if let Some(email) = &snapshot.email {
            out.push_str(&format!("Email: {}\n", email));
        }
        if let Some(consultant) = &snapshot.consultant {
            out.push_str(&format!("Consultant: {}\n", consultant));
        }
        if let Some(stage) = &snapshot.current_stage {
            out.push_str(&format!("Stage: {}\n", stage));
        }

        out.push_str("\nUPCOMING APPOINTMENTS\n");
        if snapshot.appointments.is_empty() {
            out.push_str("  (none)\n");
        }
        for appt in &snapshot.appointments {
            let mut line = format!(
                "  {} — {}",
                dates::display_or_raw(&appt.date),
                appt.doctor.as_deref().unwrap_or("unassigned")
            );
            if let Some(branch) = &appt.branch {
                line.push_str(&format!(" ({})", branch));
            }
            if appt.status == AppointmentStatus::Cancelled {
                line.push_str(" [cancelled]");
            }
            if let Some(comment) = &appt.comment {
                line.push_str(&format!(" — {}", comment));
            }
            line.push('\n');
            out.push_str(&line);
        }

        out.push_str("\nPRELIMINARY PLANS\n");
        if snapshot.preliminary_plans.is_empty() {
            out.push_str("  (none)\n");
        }
        for plan in &snapshot.preliminary_plans {
            Self::push_plan(&mut out, plan);
        }
        out.push_str(&format!(
            "Preliminary total: {:.2}\n",
            snapshot.preliminary_cost()
        ));

        out.push_str("\nAPPROVED PLANS\n");
        if snapshot.approved_plans.is_empty() {
            out.push_str("  (none)\n");
        }
        for plan in &snapshot.approved_plans {
            Self::push_plan(&mut out, plan);
        }
        out.push_str(&format!(
            "Approved total: {:.2}\nPaid: {:.2}\n",
            snapshot.approved_cost(),
            snapshot.paid_total
        ));

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, out)?;
        Ok(())
    }
}
