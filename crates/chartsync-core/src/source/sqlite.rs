//! SQLite reference implementation of [`ClinicalSource`].
//!
//! Mirrors the extraction shape of the production clinic database:
//! one demographics row per patient, schedule slots with the placeholder-
//! duration cancellation convention, preliminary and approved treatment
//! plans with line details, a payments ledger and a stage history.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ClinicalSource, DailyCandidate, SourceError, SourceResult};
use crate::dates;
use crate::models::{
    Appointment, AppointmentStatus, PatientSnapshot, PlanLine, TreatmentPlan,
};

/// Slot durations (minutes) the front desk uses to mark a cancelled
/// appointment without deleting the slot.
const CANCEL_DURATIONS: [i64; 2] = [1, 10];

/// Schema for the reference clinical database.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS patients (
    pcode TEXT PRIMARY KEY,
    last_name TEXT NOT NULL DEFAULT '',
    first_name TEXT NOT NULL DEFAULT '',
    middle_name TEXT NOT NULL DEFAULT '',
    birth_date TEXT,
    address TEXT,
    phone1 TEXT,
    phone2 TEXT,
    phone3 TEXT,
    email TEXT,
    consultant TEXT,
    first_visit_date TEXT,
    first_visit_doctor TEXT,
    age_status TEXT,
    type_status TEXT,
    primary_visit_date TEXT                       -- date of the primary visit, for discovery
);

CREATE INDEX IF NOT EXISTS idx_patients_primary_visit ON patients(primary_visit_date);

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY,
    pcode TEXT NOT NULL REFERENCES patients(pcode),
    work_date TEXT NOT NULL,
    branch TEXT,
    doctor TEXT,
    comment TEXT,
    begin_min INTEGER NOT NULL DEFAULT 0,
    end_min INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_appointments_pcode ON appointments(pcode);

CREATE TABLE IF NOT EXISTS preliminary_plans (
    id INTEGER PRIMARY KEY,
    pcode TEXT NOT NULL REFERENCES patients(pcode),
    plan_type TEXT NOT NULL,
    department TEXT
);

CREATE TABLE IF NOT EXISTS approved_plans (
    id INTEGER PRIMARY KEY,
    pcode TEXT NOT NULL REFERENCES patients(pcode),
    department TEXT,
    treat_date TEXT,
    doctor TEXT
);

CREATE TABLE IF NOT EXISTS plan_lines (
    id INTEGER PRIMARY KEY,
    plan_id INTEGER NOT NULL,
    plan_kind TEXT NOT NULL CHECK (plan_kind IN ('preliminary', 'approved')),
    service TEXT NOT NULL,
    quantity REAL NOT NULL DEFAULT 0,
    unit_price REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_plan_lines_plan ON plan_lines(plan_id, plan_kind);

CREATE TABLE IF NOT EXISTS payments (
    id INTEGER PRIMARY KEY,
    pcode TEXT NOT NULL REFERENCES patients(pcode),
    amount REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS treatment_stages (
    id INTEGER PRIMARY KEY,
    pcode TEXT NOT NULL REFERENCES patients(pcode),
    stage TEXT
);
"#;

/// SQLite-backed clinical source.
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open the clinical database at `path`, creating the schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> SourceResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        let source = Self { conn };
        source.initialize()?;
        Ok(source)
    }

    /// In-memory database (for testing).
    pub fn open_in_memory() -> SourceResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        let source = Self { conn };
        source.initialize()?;
        Ok(source)
    }

    fn initialize(&self) -> SourceResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn fetch_plans(&self, pcode: &str, kind: &str) -> SourceResult<Vec<TreatmentPlan>> {
        let (sql, title_fmt): (&str, fn(&rusqlite::Row) -> rusqlite::Result<TreatmentPlan>) =
            match kind {
                "preliminary" => (
                    "SELECT id, plan_type, department FROM preliminary_plans WHERE pcode = ? ORDER BY id",
                    |row| {
                        let plan_type: String = row.get(1)?;
                        let department: Option<String> = row.get(2)?;
                        Ok(TreatmentPlan {
                            title: format!(
                                "{} ({})",
                                plan_type,
                                department.as_deref().unwrap_or("—")
                            ),
                            date: None,
                            doctor: None,
                            lines: Vec::new(),
                        })
                    },
                ),
                _ => (
                    "SELECT id, department, treat_date, doctor FROM approved_plans WHERE pcode = ? ORDER BY id",
                    |row| {
                        let department: Option<String> = row.get(1)?;
                        Ok(TreatmentPlan {
                            title: format!(
                                "Approved plan ({})",
                                department.as_deref().unwrap_or("—")
                            ),
                            date: row.get(2)?,
                            doctor: row.get(3)?,
                            lines: Vec::new(),
                        })
                    },
                ),
            };

        let mut stmt = self.conn.prepare(sql)?;
        let plans = stmt
            .query_map([pcode], |row| {
                let id: i64 = row.get(0)?;
                Ok((id, title_fmt(row)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = Vec::with_capacity(plans.len());
        for (id, mut plan) in plans {
            let mut stmt = self.conn.prepare(
                "SELECT service, quantity, unit_price FROM plan_lines
                 WHERE plan_id = ? AND plan_kind = ? ORDER BY id",
            )?;
            plan.lines = stmt
                .query_map(params![id, kind], |row| {
                    Ok(PlanLine {
                        service: row.get(0)?,
                        quantity: row.get(1)?,
                        unit_price: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            result.push(plan);
        }
        Ok(result)
    }

    fn fetch_paid_total(&self, pcode: &str) -> SourceResult<f64> {
        let total: Option<f64> = self.conn.query_row(
            "SELECT SUM(amount) FROM payments WHERE pcode = ?",
            [pcode],
            |row| row.get(0),
        )?;
        Ok(total.unwrap_or(0.0))
    }

    fn fetch_current_stage(&self, pcode: &str) -> SourceResult<Option<String>> {
        // Last non-null stage value wins
        let mut stmt = self.conn.prepare(
            "SELECT stage FROM treatment_stages WHERE pcode = ? ORDER BY id",
        )?;
        let stages = stmt
            .query_map([pcode], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stages.into_iter().flatten().filter(|s| !s.is_empty()).last())
    }
}

impl ClinicalSource for SqliteSource {
    fn fetch_candidates_for_date(&self, date: NaiveDate) -> SourceResult<Vec<DailyCandidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT pcode, last_name, first_name, middle_name FROM patients
             WHERE primary_visit_date = ? ORDER BY pcode",
        )?;
        let rows = stmt
            .query_map([date.to_string()], |row| {
                let last: String = row.get(1)?;
                let first: String = row.get(2)?;
                let middle: String = row.get(3)?;
                Ok(DailyCandidate {
                    pcode: row.get(0)?,
                    full_name: [last, first, middle]
                        .iter()
                        .map(|s| s.trim())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join(" "),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn fetch_snapshot(&self, pcode: &str) -> SourceResult<Option<PatientSnapshot>> {
        let main = self
            .conn
            .query_row(
                "SELECT pcode, last_name, first_name, middle_name, birth_date,
                        address, phone1, phone2, phone3, email, consultant,
                        first_visit_date, first_visit_doctor, age_status, type_status
                 FROM patients WHERE pcode = ?",
                [pcode],
                |row| {
                    let birth_raw: Option<String> = row.get(4)?;
                    let first_visit_raw: Option<String> = row.get(11)?;
                    let phones: Vec<String> = [
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, Option<String>>(8)?,
                    ]
                    .into_iter()
                    .flatten()
                    .filter(|p| !p.is_empty())
                    .collect();
                    Ok(PatientSnapshot {
                        pcode: row.get(0)?,
                        last_name: row.get(1)?,
                        first_name: row.get(2)?,
                        middle_name: row.get(3)?,
                        birth_date: birth_raw.as_deref().and_then(dates::parse_flexible),
                        address: row.get(5)?,
                        phones,
                        email: row.get(9)?,
                        consultant: row.get(10)?,
                        first_visit_date: first_visit_raw
                            .as_deref()
                            .and_then(dates::parse_flexible),
                        first_visit_doctor: row.get(12)?,
                        age_status: row.get(13)?,
                        type_status: row.get(14)?,
                        current_stage: None,
                        paid_total: 0.0,
                        appointments: Vec::new(),
                        preliminary_plans: Vec::new(),
                        approved_plans: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut snapshot) = main else {
            return Ok(None);
        };

        snapshot.appointments = self.fetch_upcoming_appointments(pcode)?;
        snapshot.preliminary_plans = self.fetch_plans(pcode, "preliminary")?;
        snapshot.approved_plans = self.fetch_plans(pcode, "approved")?;
        snapshot.paid_total = self.fetch_paid_total(pcode)?;
        snapshot.current_stage = self.fetch_current_stage(pcode)?;

        Ok(Some(snapshot))
    }

    fn fetch_upcoming_appointments(&self, pcode: &str) -> SourceResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(
            "SELECT work_date, branch, doctor, comment, begin_min, end_min
             FROM appointments WHERE pcode = ? ORDER BY work_date, id",
        )?;
        let rows = stmt
            .query_map([pcode], |row| {
                let begin: i64 = row.get(4)?;
                let end: i64 = row.get(5)?;
                let status = if CANCEL_DURATIONS.contains(&(end - begin)) {
                    AppointmentStatus::Cancelled
                } else {
                    AppointmentStatus::Expected
                };
                Ok(Appointment {
                    date: row.get(0)?,
                    branch: row.get(1)?,
                    doctor: row.get(2)?,
                    comment: row.get(3)?,
                    status,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Fixture/seed helpers. The production clinic database is read-only for
/// this system; these exist for tests and demo databases.
impl SqliteSource {
    pub fn seed_patient(
        &self,
        pcode: &str,
        last_name: &str,
        first_name: &str,
        primary_visit_date: Option<&str>,
    ) -> SourceResult<()> {
        self.conn.execute(
            "INSERT INTO patients (pcode, last_name, first_name, primary_visit_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![pcode, last_name, first_name, primary_visit_date],
        )?;
        Ok(())
    }

    pub fn set_patient_field(&self, pcode: &str, column: &str, value: &str) -> SourceResult<()> {
        // Column names come from test code, not user input
        let sql = format!("UPDATE patients SET {} = ?1 WHERE pcode = ?2", column);
        self.conn.execute(&sql, params![value, pcode])?;
        Ok(())
    }

    pub fn seed_appointment(
        &self,
        pcode: &str,
        work_date: &str,
        doctor: Option<&str>,
        begin_min: i64,
        end_min: i64,
    ) -> SourceResult<()> {
        self.conn.execute(
            "INSERT INTO appointments (pcode, work_date, doctor, begin_min, end_min)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![pcode, work_date, doctor, begin_min, end_min],
        )?;
        Ok(())
    }

    pub fn seed_approved_plan(
        &self,
        pcode: &str,
        department: &str,
        treat_date: &str,
        lines: &[(&str, f64, f64)],
    ) -> SourceResult<()> {
        self.conn.execute(
            "INSERT INTO approved_plans (pcode, department, treat_date) VALUES (?1, ?2, ?3)",
            params![pcode, department, treat_date],
        )?;
        let plan_id = self.conn.last_insert_rowid();
        for (service, quantity, unit_price) in lines {
            self.conn.execute(
                "INSERT INTO plan_lines (plan_id, plan_kind, service, quantity, unit_price)
                 VALUES (?1, 'approved', ?2, ?3, ?4)",
                params![plan_id, service, quantity, unit_price],
            )?;
        }
        Ok(())
    }

    pub fn seed_preliminary_plan(
        &self,
        pcode: &str,
        plan_type: &str,
        lines: &[(&str, f64, f64)],
    ) -> SourceResult<()> {
        self.conn.execute(
            "INSERT INTO preliminary_plans (pcode, plan_type) VALUES (?1, ?2)",
            params![pcode, plan_type],
        )?;
        let plan_id = self.conn.last_insert_rowid();
        for (service, quantity, unit_price) in lines {
            self.conn.execute(
                "INSERT INTO plan_lines (plan_id, plan_kind, service, quantity, unit_price)
                 VALUES (?1, 'preliminary', ?2, ?3, ?4)",
                params![plan_id, service, quantity, unit_price],
            )?;
        }
        Ok(())
    }

    pub fn seed_payment(&self, pcode: &str, amount: f64) -> SourceResult<()> {
        self.conn.execute(
            "INSERT INTO payments (pcode, amount) VALUES (?1, ?2)",
            params![pcode, amount],
        )?;
        Ok(())
    }

    pub fn seed_stage(&self, pcode: &str, stage: Option<&str>) -> SourceResult<()> {
        self.conn.execute(
            "INSERT INTO treatment_stages (pcode, stage) VALUES (?1, ?2)",
            params![pcode, stage],
        )?;
        Ok(())
    }
}
