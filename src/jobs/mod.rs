//! Job rows: loading, resolution, validation and payload compilation

pub mod dates;
pub mod issue;
pub mod loader;
pub mod payload;
pub mod recurrence;
pub mod resolver;
pub mod row;
pub mod validator;

pub use issue::{Issue, IssueCategory, IssueCode, IssueStatus};
pub use loader::{JobSheet, load_rows, parse_csv};
pub use payload::{FloorsSpaces, JobPayload, PayloadError, build_job_payload, build_row_payload};
pub use recurrence::{CompiledRecurrence, Period, RecurrenceError, RecurrenceSpec, RecurrenceType, StopMode};
pub use resolver::{Resolution, RowResolver};
pub use row::{JobRow, ResolvedIds, ResolvedRow};
pub use validator::{DuplicateTracker, JobValidator, RowValidation};
