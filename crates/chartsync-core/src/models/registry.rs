//! Known-patient tracking metadata.

use serde::{Deserialize, Serialize};

/// Tracking metadata for one known patient, keyed by pcode in the registry.
///
/// Entries are created on first sighting and never deleted by the core.
/// All date fields are ISO `YYYY-MM-DD` strings; `data_hash` is the last
/// persisted fingerprint, absent for a never-rendered patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KnownPatientEntry {
    /// Date of the most recent evaluation
    pub last_checked: Option<String>,
    /// Most recent known future-appointment date
    pub last_appointment_date: Option<String>,
    /// Fingerprint at the time the document was last regenerated
    pub data_hash: Option<String>,
    /// Date a document was last regenerated
    pub last_updated: Option<String>,
    /// Within-run dedup marker
    pub processed_on: Option<String>,
}

impl KnownPatientEntry {
    /// A patient counts as new until a fingerprint has been persisted.
    pub fn is_new(&self) -> bool {
        self.data_hash.is_none()
    }
}
