//! Domain models.

mod registry;
mod report;
mod snapshot;

pub use registry::*;
pub use report::*;
pub use snapshot::*;
