//! Reference data (sites, floors, spaces, users) and the lookup index built over it

pub mod index;
pub mod record;

pub use index::{IndexDiagnostics, KindDiagnostics, ReferenceData, ReferenceIndex, normalize_name};
pub use record::{EntityKind, ReferenceRecord};
