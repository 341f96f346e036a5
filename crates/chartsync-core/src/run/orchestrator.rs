//! The run loop.
//!
//! One run walks its dates in order; for each date it assembles the
//! candidate set, evaluates every candidate at most once per run, and
//! checkpoints the registry before moving on. After the last date the
//! export pipeline fires once over everything the run touched.
//!
//! Per-patient and per-stage failures are logged and counted, never
//! propagated: a cron run must always finish and persist what it learned.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Settings, REPORT_TITLE};
use crate::export::{
    collect_personal_rows, collect_rows, write_medical_csv, write_personal_csv, CrmUploader,
    ExportArtifacts,
};
use crate::fingerprint::fingerprint;
use crate::models::KnownPatientEntry;
use crate::render::DocumentRenderer;
use crate::report::{merge_rows, ReportDocument};
use crate::run::context::RunContext;
use crate::run::decision::{decide, Decision};
use crate::source::ClinicalSource;
use crate::store::{KnownPatientStore, Registry};

/// Counters for one finished run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub dates: usize,
    pub evaluated: usize,
    pub regenerated: usize,
    pub skipped: usize,
    pub missing: usize,
    pub failed: usize,
    pub exported_rows: usize,
}

enum Outcome {
    Regenerated,
    Skipped,
    Missing,
    Failed,
}

/// Drives one run end to end.
pub struct Orchestrator<'a, S, R, U>
where
    S: ClinicalSource,
    R: DocumentRenderer,
    U: CrmUploader,
{
    source: &'a S,
    renderer: &'a R,
    uploader: &'a U,
    store: &'a KnownPatientStore,
    settings: &'a Settings,
}

impl<'a, S, R, U> Orchestrator<'a, S, R, U>
where
    S: ClinicalSource,
    R: DocumentRenderer,
    U: CrmUploader,
{
    pub fn new(
        source: &'a S,
        renderer: &'a R,
        uploader: &'a U,
        store: &'a KnownPatientStore,
        settings: &'a Settings,
    ) -> Self {
        Self {
            source,
            renderer,
            uploader,
            store,
            settings,
        }
    }

    /// Execute the run described by `ctx`.
    pub fn run(&self, ctx: &RunContext) -> RunSummary {
        let run_id = Uuid::new_v4();
        info!(%run_id, dates = ctx.dates.len(), filtered = !ctx.filter.is_empty(), "run started");

        let mut registry = self.store.load();
        let mut summary = RunSummary {
            dates: ctx.dates.len(),
            ..Default::default()
        };
        let mut evaluated_this_run: HashSet<String> = HashSet::new();
        // deduplicated by evaluated_this_run, sorted before export
        let mut touched: Vec<String> = Vec::new();

        for &date in &ctx.dates {
            let candidates = self.candidates_for(date, ctx, &mut registry);
            info!(%run_id, %date, candidates = candidates.len(), "processing date");

            for pcode in candidates {
                if !evaluated_this_run.insert(pcode.clone()) {
                    continue;
                }
                summary.evaluated += 1;
                touched.push(pcode.clone());

                let entry = registry.entry(pcode.clone()).or_default();
                match self.evaluate(&pcode, date, entry) {
                    Outcome::Regenerated => summary.regenerated += 1,
                    Outcome::Skipped => summary.skipped += 1,
                    Outcome::Missing => summary.missing += 1,
                    Outcome::Failed => summary.failed += 1,
                }
            }

            // checkpoint so a crash on a later date loses nothing
            if let Err(e) = self.store.save(&registry) {
                warn!(%run_id, %date, error = %e, "registry checkpoint failed");
            }
        }

        if touched.is_empty() {
            // nothing touched: the previous run's exports stay as they are
            info!(%run_id, "no candidates evaluated, export skipped");
        } else if let Some(&last_date) = ctx.dates.last() {
            touched.sort();
            summary.exported_rows = self.finalize(&touched, last_date);
        }

        info!(
            %run_id,
            evaluated = summary.evaluated,
            regenerated = summary.regenerated,
            skipped = summary.skipped,
            missing = summary.missing,
            failed = summary.failed,
            exported = summary.exported_rows,
            "run finished"
        );
        summary
    }

    /// Candidate pcodes for one date. An explicit filter is exclusive;
    /// otherwise the registry replay comes first, then daily discovery,
    /// with unknown discoveries entering the registry on the spot.
    fn candidates_for(
        &self,
        date: NaiveDate,
        ctx: &RunContext,
        registry: &mut Registry,
    ) -> Vec<String> {
        if !ctx.filter.is_empty() {
            return ctx.filter.clone();
        }

        let date_str = date.to_string();
        let mut candidates: Vec<String> = registry
            .iter()
            .filter(|(_, entry)| match &entry.last_checked {
                Some(checked) => checked.as_str() < date_str.as_str(),
                None => true,
            })
            .map(|(pcode, _)| pcode.clone())
            .collect();

        match self.source.fetch_candidates_for_date(date) {
            Ok(daily) => {
                for candidate in daily {
                    if !registry.contains_key(&candidate.pcode) {
                        info!(pcode = %candidate.pcode, name = %candidate.full_name,
                              "new patient discovered");
                        registry.insert(candidate.pcode.clone(), KnownPatientEntry::default());
                        candidates.push(candidate.pcode);
                    } else if !candidates.contains(&candidate.pcode) {
                        candidates.push(candidate.pcode);
                    }
                }
            }
            Err(e) => warn!(%date, error = %e, "daily discovery failed"),
        }

        candidates
    }

    fn evaluate(&self, pcode: &str, date: NaiveDate, entry: &mut KnownPatientEntry) -> Outcome {
        let date_str = date.to_string();

        let snapshot = match self.source.fetch_snapshot(pcode) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                warn!(pcode, %date, "patient unknown to clinical source");
                entry.last_checked = Some(date_str.clone());
                entry.processed_on = Some(date_str);
                return Outcome::Missing;
            }
            Err(e) => {
                // the attempt still counts; fingerprint state stays stale
                // so the next run retries
                warn!(pcode, %date, error = %e, "extraction failed");
                entry.last_checked = Some(date_str.clone());
                entry.processed_on = Some(date_str);
                return Outcome::Failed;
            }
        };

        let fresh_hash = fingerprint(&snapshot);
        let latest_appointment = snapshot.latest_appointment_date();
        let artifact = self
            .renderer
            .artifact_path(&self.settings.docs_dir, pcode);

        let outcome = match decide(entry, &fresh_hash, latest_appointment, artifact.exists()) {
            Decision::Skip => {
                info!(pcode, %date, "unchanged, skipping");
                Outcome::Skipped
            }
            Decision::Regenerate(reason) => {
                info!(pcode, %date, reason = reason.as_str(), "regenerating document");
                match self.renderer.render(&snapshot, &artifact) {
                    Ok(()) => {
                        entry.data_hash = Some(fresh_hash);
                        entry.last_updated = Some(date_str.clone());
                        entry.last_appointment_date =
                            latest_appointment.map(|d| d.to_string());
                        Outcome::Regenerated
                    }
                    Err(e) => {
                        // hash and last_updated stay stale so the next run
                        // retries the render; the attempt itself is recorded
                        warn!(pcode, %date, error = %e, "render failed");
                        entry.last_checked = Some(date_str.clone());
                        entry.processed_on = Some(date_str);
                        return Outcome::Failed;
                    }
                }
            }
        };

        entry.last_checked = Some(date_str.clone());
        entry.processed_on = Some(date_str);
        outcome
    }

    /// Run-end export: CSV files, report merge, upload. Each stage is
    /// independent; one failing never blocks the others.
    fn finalize(&self, touched: &[String], as_of: NaiveDate) -> usize {
        let rows = collect_rows(self.source, touched, as_of);
        let personal = collect_personal_rows(self.source, touched);
        let exported = rows.len();

        let medical_path = self.settings.medical_csv_path();
        if let Err(e) = write_medical_csv(&medical_path, &rows) {
            warn!(path = %medical_path.display(), error = %e, "medical CSV export failed");
        }
        let personal_path = self.settings.personal_csv_path();
        if let Err(e) = write_personal_csv(&personal_path, &personal) {
            warn!(path = %personal_path.display(), error = %e, "personal CSV export failed");
        }

        match ReportDocument::load(&self.settings.report_path) {
            Ok(existing) => {
                let merged = merge_rows(existing, &rows, REPORT_TITLE);
                if let Err(e) = merged.save(&self.settings.report_path) {
                    warn!(path = %self.settings.report_path.display(), error = %e,
                          "report save failed");
                }
            }
            Err(e) => {
                // leave the file for inspection rather than overwrite it
                warn!(path = %self.settings.report_path.display(), error = %e,
                      "report unreadable, merge skipped");
            }
        }

        let artifacts = ExportArtifacts {
            medical_csv: medical_path,
            personal_csv: personal_path,
            report_doc: self.settings.report_path.clone(),
        };
        if let Err(e) = self.uploader.upload(&artifacts) {
            warn!(error = %e, "upload failed");
        }

        exported
    }
}
