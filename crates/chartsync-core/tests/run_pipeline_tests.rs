//! End-to-end runs over a scripted clinical source.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;

use chrono::NaiveDate;
use tempfile::TempDir;

use chartsync_core::config::{Settings, UploadMode};
use chartsync_core::models::{
    Appointment, AppointmentStatus, PatientSnapshot, PlanLine, TreatmentPlan,
};
use chartsync_core::report::ReportDocument;
use chartsync_core::run::RunContext;
use chartsync_core::source::{ClinicalSource, DailyCandidate, SourceError, SourceResult};
use chartsync_core::{KnownPatientStore, NoopUploader, Orchestrator, TextRenderer};

struct ScriptedSource {
    snapshots: RefCell<HashMap<String, PatientSnapshot>>,
    daily: HashMap<NaiveDate, Vec<DailyCandidate>>,
    failing: RefCell<HashSet<String>>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self {
            snapshots: RefCell::new(HashMap::new()),
            daily: HashMap::new(),
            failing: RefCell::new(HashSet::new()),
        }
    }

    fn with_patient(mut self, snapshot: PatientSnapshot, discovered_on: &str) -> Self {
        let date: NaiveDate = discovered_on.parse().unwrap();
        self.daily.entry(date).or_default().push(DailyCandidate {
            pcode: snapshot.pcode.clone(),
            full_name: snapshot.full_name(),
        });
        self.snapshots
            .borrow_mut()
            .insert(snapshot.pcode.clone(), snapshot);
        self
    }

    fn update_patient(&self, snapshot: PatientSnapshot) {
        self.snapshots
            .borrow_mut()
            .insert(snapshot.pcode.clone(), snapshot);
    }

    fn fail_for(&self, pcode: &str) {
        self.failing.borrow_mut().insert(pcode.to_string());
    }
}

impl ClinicalSource for ScriptedSource {
    fn fetch_candidates_for_date(&self, date: NaiveDate) -> SourceResult<Vec<DailyCandidate>> {
        Ok(self.daily.get(&date).cloned().unwrap_or_default())
    }

    fn fetch_snapshot(&self, pcode: &str) -> SourceResult<Option<PatientSnapshot>> {
        if self.failing.borrow().contains(pcode) {
            return Err(SourceError::Connection("scripted failure".into()));
        }
        Ok(self.snapshots.borrow().get(pcode).cloned())
    }

    fn fetch_upcoming_appointments(&self, pcode: &str) -> SourceResult<Vec<Appointment>> {
        Ok(self
            .snapshots
            .borrow()
            .get(pcode)
            .map(|s| s.appointments.clone())
            .unwrap_or_default())
    }
}

fn patient(pcode: &str, last_name: &str) -> PatientSnapshot {
    PatientSnapshot {
        pcode: pcode.into(),
        last_name: last_name.into(),
        first_name: "John".into(),
        middle_name: "".into(),
        birth_date: NaiveDate::from_ymd_opt(1990, 5, 1),
        address: Some("1 Main St".into()),
        phones: vec!["111".into()],
        email: None,
        consultant: None,
        first_visit_date: NaiveDate::from_ymd_opt(2024, 1, 10),
        first_visit_doctor: Some("Dr. Wu".into()),
        age_status: Some("Adult".into()),
        type_status: None,
        current_stage: Some("Consultation".into()),
        paid_total: 50.0,
        appointments: vec![Appointment {
            date: "2024-02-01".into(),
            branch: Some("Main".into()),
            doctor: Some("Dr. Wu".into()),
            comment: None,
            status: AppointmentStatus::Expected,
        }],
        preliminary_plans: vec![],
        approved_plans: vec![TreatmentPlan {
            title: "Approved plan (Therapy)".into(),
            date: Some("2024-01-10".into()),
            doctor: None,
            lines: vec![PlanLine {
                service: "Cleaning".into(),
                quantity: 1.0,
                unit_price: 100.0,
            }],
        }],
    }
}

struct Harness {
    _dir: TempDir,
    settings: Settings,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let settings = Settings {
            db_path: root.join("clinic.db"),
            registry_path: root.join("known_patients.json"),
            docs_dir: root.join("docs"),
            csv_dir: root.join("export"),
            report_path: root.join("export/management_report.json"),
            outbox_dir: root.join("outbox"),
            upload_mode: UploadMode::None,
            log_filter: "off".into(),
        };
        Self {
            _dir: dir,
            settings,
        }
    }

    fn store(&self) -> KnownPatientStore {
        KnownPatientStore::new(&self.settings.registry_path)
    }

    fn run(&self, source: &ScriptedSource, ctx: &RunContext) -> chartsync_core::RunSummary {
        let store = self.store();
        let renderer = TextRenderer;
        let uploader = NoopUploader;
        Orchestrator::new(source, &renderer, &uploader, &store, &self.settings).run(ctx)
    }
}

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn test_first_sighting_renders_registers_and_exports() {
    let harness = Harness::new();
    let source = ScriptedSource::new().with_patient(patient("P1", "Smith"), "2024-01-10");

    let summary = harness.run(&source, &RunContext::for_date(d("2024-01-10")));

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.regenerated, 1);
    assert_eq!(summary.exported_rows, 1);

    let registry = harness.store().load();
    let entry = &registry["P1"];
    assert!(entry.data_hash.is_some());
    assert_eq!(entry.last_checked.as_deref(), Some("2024-01-10"));
    assert_eq!(entry.processed_on.as_deref(), Some("2024-01-10"));
    assert_eq!(entry.last_appointment_date.as_deref(), Some("2024-02-01"));

    assert!(harness.settings.docs_dir.join("P1.txt").exists());
    let csv = fs::read_to_string(harness.settings.medical_csv_path()).unwrap();
    assert!(csv.contains("Smith John"));
    assert!(harness.settings.personal_csv_path().exists());

    let report = ReportDocument::load(&harness.settings.report_path)
        .unwrap()
        .unwrap();
    assert!(report.rows.len() > 1);
}

#[test]
fn test_unchanged_rerun_skips_render() {
    let harness = Harness::new();
    let source = ScriptedSource::new().with_patient(patient("P1", "Smith"), "2024-01-10");

    harness.run(&source, &RunContext::for_date(d("2024-01-10")));
    // replayed on the next date because nothing changed since
    let summary = harness.run(&source, &RunContext::for_date(d("2024-01-11")));

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.regenerated, 0);

    let registry = harness.store().load();
    let entry = &registry["P1"];
    assert_eq!(entry.last_updated.as_deref(), Some("2024-01-10"));
    assert_eq!(entry.last_checked.as_deref(), Some("2024-01-11"));
}

#[test]
fn test_content_change_triggers_regeneration() {
    let harness = Harness::new();
    let source = ScriptedSource::new().with_patient(patient("P1", "Smith"), "2024-01-10");
    harness.run(&source, &RunContext::for_date(d("2024-01-10")));
    let old_hash = harness.store().load()["P1"].data_hash.clone();

    let mut updated = patient("P1", "Smith");
    updated.paid_total = 100.0;
    source.update_patient(updated);

    let summary = harness.run(&source, &RunContext::for_date(d("2024-01-11")));
    assert_eq!(summary.regenerated, 1);

    let registry = harness.store().load();
    assert_ne!(registry["P1"].data_hash, old_hash);
    assert_eq!(registry["P1"].last_updated.as_deref(), Some("2024-01-11"));

    let doc = fs::read_to_string(harness.settings.docs_dir.join("P1.txt")).unwrap();
    assert!(doc.contains("Paid: 100.00"));
}

#[test]
fn test_deleted_artifact_is_restored() {
    let harness = Harness::new();
    let source = ScriptedSource::new().with_patient(patient("P1", "Smith"), "2024-01-10");
    harness.run(&source, &RunContext::for_date(d("2024-01-10")));

    fs::remove_file(harness.settings.docs_dir.join("P1.txt")).unwrap();

    let summary = harness.run(&source, &RunContext::for_date(d("2024-01-11")));
    assert_eq!(summary.regenerated, 1);
    assert!(harness.settings.docs_dir.join("P1.txt").exists());
}

#[test]
fn test_patient_evaluated_once_per_run_across_dates() {
    let harness = Harness::new();
    // discovered on both dates
    let source = ScriptedSource::new()
        .with_patient(patient("P1", "Smith"), "2024-01-10")
        .with_patient(patient("P2", "Doe"), "2024-01-11");
    let ctx = RunContext::for_range(d("2024-01-10"), d("2024-01-11")).unwrap();

    let summary = harness.run(&source, &ctx);
    // P1 discovered on the 10th, replayed candidate on the 11th: one evaluation
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.regenerated, 2);
}

#[test]
fn test_filter_is_exclusive() {
    let harness = Harness::new();
    let source = ScriptedSource::new()
        .with_patient(patient("P1", "Smith"), "2024-01-10")
        .with_patient(patient("P2", "Doe"), "2024-01-10");

    let ctx = RunContext::for_date(d("2024-01-10")).with_filter(vec!["P2".into()]);
    let summary = harness.run(&source, &ctx);

    assert_eq!(summary.evaluated, 1);
    let registry = harness.store().load();
    assert!(registry.contains_key("P2"));
    assert!(!registry.contains_key("P1"));
}

#[test]
fn test_unknown_patient_is_stamped_but_not_exported() {
    let harness = Harness::new();
    let source = ScriptedSource::new();

    let ctx = RunContext::for_date(d("2024-01-10")).with_filter(vec!["PX".into()]);
    let summary = harness.run(&source, &ctx);

    assert_eq!(summary.missing, 1);
    assert_eq!(summary.exported_rows, 0);
    let registry = harness.store().load();
    assert_eq!(registry["PX"].last_checked.as_deref(), Some("2024-01-10"));
    assert!(registry["PX"].data_hash.is_none());
}

#[test]
fn test_extraction_failure_marks_attempt_but_keeps_fingerprint_state() {
    let harness = Harness::new();
    let source = ScriptedSource::new().with_patient(patient("P1", "Smith"), "2024-01-10");
    harness.run(&source, &RunContext::for_date(d("2024-01-10")));
    let before = harness.store().load()["P1"].clone();

    source.fail_for("P1");
    let summary = harness.run(&source, &RunContext::for_date(d("2024-01-11")));

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.regenerated, 0);

    // the attempt is visible in persisted state even though it failed
    let after = harness.store().load()["P1"].clone();
    assert_eq!(after.last_checked.as_deref(), Some("2024-01-11"));
    assert_eq!(after.processed_on.as_deref(), Some("2024-01-11"));
    // fingerprint state is untouched so the next run retries
    assert_eq!(after.data_hash, before.data_hash);
    assert_eq!(after.last_updated, before.last_updated);
    assert_eq!(after.last_appointment_date, before.last_appointment_date);
}

#[test]
fn test_failed_first_attempt_is_stamped_too() {
    let harness = Harness::new();
    let source = ScriptedSource::new().with_patient(patient("P1", "Smith"), "2024-01-10");
    source.fail_for("P1");

    let ctx = RunContext::for_date(d("2024-01-10")).with_filter(vec!["P1".into()]);
    let summary = harness.run(&source, &ctx);

    assert_eq!(summary.failed, 1);
    let entry = harness.store().load()["P1"].clone();
    assert_eq!(entry.processed_on.as_deref(), Some("2024-01-10"));
    assert!(entry.data_hash.is_none());
}

#[test]
fn test_registry_checkpoint_survives_later_failure() {
    let harness = Harness::new();
    let source = ScriptedSource::new()
        .with_patient(patient("P1", "Smith"), "2024-01-10")
        .with_patient(patient("P2", "Doe"), "2024-01-11");
    source.fail_for("P2");

    let ctx = RunContext::for_range(d("2024-01-10"), d("2024-01-11")).unwrap();
    let summary = harness.run(&source, &ctx);

    assert_eq!(summary.failed, 1);
    // P1's first-day result was checkpointed despite the second-day failure
    let registry = harness.store().load();
    assert!(registry["P1"].data_hash.is_some());
}

#[test]
fn test_quiet_run_leaves_previous_exports_alone() {
    let harness = Harness::new();
    let source = ScriptedSource::new().with_patient(patient("P1", "Smith"), "2024-01-10");
    harness.run(&source, &RunContext::for_date(d("2024-01-10")));
    let csv_before = fs::read_to_string(harness.settings.medical_csv_path()).unwrap();

    // the 9th has no discoveries and P1's last check already covers it,
    // so the run evaluates nobody
    let summary = harness.run(&source, &RunContext::for_date(d("2024-01-09")));

    assert_eq!(summary.evaluated, 0);
    assert_eq!(summary.exported_rows, 0);
    let csv_after = fs::read_to_string(harness.settings.medical_csv_path()).unwrap();
    assert_eq!(csv_after, csv_before);
}

#[test]
fn test_empty_run_produces_no_export_files() {
    let harness = Harness::new();
    let source = ScriptedSource::new();

    let summary = harness.run(&source, &RunContext::for_date(d("2024-01-10")));

    assert_eq!(summary.evaluated, 0);
    assert_eq!(summary.exported_rows, 0);
    assert!(!harness.settings.medical_csv_path().exists());
    assert!(!harness.settings.personal_csv_path().exists());
    assert!(!harness.settings.report_path.exists());
}

#[test]
fn test_export_rows_are_sorted_by_pcode() {
    let harness = Harness::new();
    // discovery order deliberately reversed relative to pcode order
    let source = ScriptedSource::new()
        .with_patient(patient("P2", "Alvarez"), "2024-01-10")
        .with_patient(patient("P1", "Smith"), "2024-01-10");

    harness.run(&source, &RunContext::for_date(d("2024-01-10")));

    let csv = fs::read_to_string(harness.settings.medical_csv_path()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("Smith John"));
    assert!(lines[2].starts_with("Alvarez John"));
}

#[test]
fn test_report_accumulates_across_runs() {
    let harness = Harness::new();
    let source = ScriptedSource::new()
        .with_patient(patient("P1", "Smith"), "2024-01-10")
        .with_patient(patient("P2", "Doe"), "2024-01-11");

    harness.run(&source, &RunContext::for_date(d("2024-01-10")));
    harness.run(&source, &RunContext::for_date(d("2024-01-11")));

    let report = ReportDocument::load(&harness.settings.report_path)
        .unwrap()
        .unwrap();
    let names: Vec<String> = report
        .rows
        .iter()
        .skip(1)
        .filter_map(|r| r.get(1).and_then(|c| c.as_text().map(str::to_string)))
        .collect();
    assert!(names.contains(&"Smith John".to_string()));
    assert!(names.contains(&"Doe John".to_string()));
}
