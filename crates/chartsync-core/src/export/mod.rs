//! Run-end export surface: display-row projection, CSV files and the
//! upload hand-off.

mod csv;
mod rows;
mod upload;

pub use csv::{write_medical_csv, write_personal_csv, ExportError, ExportResult};
pub use rows::{collect_personal_rows, collect_rows, project_personal_row, project_row};
pub use upload::{CrmUploader, ExportArtifacts, NoopUploader, OutboxUploader, UploadError};
