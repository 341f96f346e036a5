//! The per-patient regenerate-or-skip decision.
//!
//! Pure function over tracking state and fresh extraction facts; the
//! orchestrator supplies both and acts on the verdict. Reasons are
//! checked in a fixed precedence so logs always name the strongest one.

use chrono::NaiveDate;

use crate::dates;
use crate::models::KnownPatientEntry;

/// Why a document is being regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenReason {
    /// No document exists on disk
    MissingArtifact,
    /// No fingerprint was ever persisted for this patient
    FirstSighting,
    /// Fingerprint differs from the stored one
    ContentChanged,
    /// A future appointment later than the last known one appeared
    LaterAppointment,
}

impl RegenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegenReason::MissingArtifact => "missing artifact",
            RegenReason::FirstSighting => "first sighting",
            RegenReason::ContentChanged => "content changed",
            RegenReason::LaterAppointment => "later appointment",
        }
    }
}

/// Verdict for one patient on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Regenerate(RegenReason),
}

/// Decide whether the patient's document needs regeneration.
pub fn decide(
    entry: &KnownPatientEntry,
    fresh_hash: &str,
    latest_appointment: Option<NaiveDate>,
    artifact_exists: bool,
) -> Decision {
    if !artifact_exists {
        return Decision::Regenerate(RegenReason::MissingArtifact);
    }
    if entry.is_new() {
        return Decision::Regenerate(RegenReason::FirstSighting);
    }
    if entry.data_hash.as_deref() != Some(fresh_hash) {
        return Decision::Regenerate(RegenReason::ContentChanged);
    }
    let stored_appointment = entry
        .last_appointment_date
        .as_deref()
        .and_then(dates::parse_flexible);
    match (stored_appointment, latest_appointment) {
        (None, Some(_)) => Decision::Regenerate(RegenReason::LaterAppointment),
        (Some(stored), Some(latest)) if latest > stored => {
            Decision::Regenerate(RegenReason::LaterAppointment)
        }
        _ => Decision::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn tracked() -> KnownPatientEntry {
        KnownPatientEntry {
            last_checked: Some("2024-01-10".into()),
            last_appointment_date: Some("2024-02-01".into()),
            data_hash: Some("aaaa".into()),
            last_updated: Some("2024-01-10".into()),
            processed_on: None,
        }
    }

    #[test]
    fn test_missing_artifact_beats_everything() {
        // even an unchanged hash regenerates when the file is gone
        let decision = decide(&tracked(), "aaaa", Some(d("2024-02-01")), false);
        assert_eq!(decision, Decision::Regenerate(RegenReason::MissingArtifact));
    }

    #[test]
    fn test_first_sighting() {
        let entry = KnownPatientEntry::default();
        let decision = decide(&entry, "aaaa", None, true);
        assert_eq!(decision, Decision::Regenerate(RegenReason::FirstSighting));
    }

    #[test]
    fn test_content_change() {
        let decision = decide(&tracked(), "bbbb", Some(d("2024-02-01")), true);
        assert_eq!(decision, Decision::Regenerate(RegenReason::ContentChanged));
    }

    #[test]
    fn test_later_appointment() {
        let decision = decide(&tracked(), "aaaa", Some(d("2024-03-01")), true);
        assert_eq!(decision, Decision::Regenerate(RegenReason::LaterAppointment));
    }

    #[test]
    fn test_first_appointment_ever_counts_as_later() {
        let mut entry = tracked();
        entry.last_appointment_date = None;
        let decision = decide(&entry, "aaaa", Some(d("2024-02-01")), true);
        assert_eq!(decision, Decision::Regenerate(RegenReason::LaterAppointment));
    }

    #[test]
    fn test_unchanged_is_skip() {
        assert_eq!(decide(&tracked(), "aaaa", Some(d("2024-02-01")), true), Decision::Skip);
        // earlier appointment than stored is not a trigger
        assert_eq!(decide(&tracked(), "aaaa", Some(d("2024-01-15")), true), Decision::Skip);
        // appointment disappearing is not a trigger either
        assert_eq!(decide(&tracked(), "aaaa", None, true), Decision::Skip);
    }
}
