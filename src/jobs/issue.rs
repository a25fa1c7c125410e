//! Validation findings reported per row

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueStatus {
    Ok,
    Warn,
    Error,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Ok => "OK",
            IssueStatus::Warn => "WARN",
            IssueStatus::Error => "ERROR",
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, IssueStatus::Error)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable issue codes, grouped in the order the validator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // resolution
    MissingSite,
    MissingOwner,
    // presence
    MissingRequired,
    // dates and times
    InvalidDate,
    PastDate,
    InvalidDateRange,
    InvalidTime,
    InvalidHour,
    InvalidMinute,
    InvalidTimeRange,
    // referential integrity
    InvalidSite,
    InvalidFloor,
    FloorSiteMismatch,
    SpaceWithoutFloor,
    InvalidSpace,
    SpaceFloorMismatch,
    InvalidOwner,
    // batch
    DuplicateRow,
    // recurrence
    InvalidRecurrenceType,
    MissingRecurrenceEnd,
    InvalidRecurrenceEnd,
    InvalidRecurrenceEndFormat,
    InvalidRecurrenceDays,
    InvalidRecurrenceInterval,
    InvalidRecurrenceIntervalFormat,
    // no findings
    Valid,
}

/// Coarse grouping used for filtering reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Resolution,
    Field,
    Referential,
    Duplicate,
    Recurrence,
    Valid,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingSite => "MISSING_SITE",
            IssueCode::MissingOwner => "MISSING_OWNER",
            IssueCode::MissingRequired => "MISSING_REQUIRED",
            IssueCode::InvalidDate => "INVALID_DATE",
            IssueCode::PastDate => "PAST_DATE",
            IssueCode::InvalidDateRange => "INVALID_DATE_RANGE",
            IssueCode::InvalidTime => "INVALID_TIME",
            IssueCode::InvalidHour => "INVALID_HOUR",
            IssueCode::InvalidMinute => "INVALID_MINUTE",
            IssueCode::InvalidTimeRange => "INVALID_TIME_RANGE",
            IssueCode::InvalidSite => "INVALID_SITE",
            IssueCode::InvalidFloor => "INVALID_FLOOR",
            IssueCode::FloorSiteMismatch => "FLOOR_SITE_MISMATCH",
            IssueCode::SpaceWithoutFloor => "SPACE_WITHOUT_FLOOR",
            IssueCode::InvalidSpace => "INVALID_SPACE",
            IssueCode::SpaceFloorMismatch => "SPACE_FLOOR_MISMATCH",
            IssueCode::InvalidOwner => "INVALID_OWNER",
            IssueCode::DuplicateRow => "DUPLICATE_ROW",
            IssueCode::InvalidRecurrenceType => "INVALID_RECURRENCE_TYPE",
            IssueCode::MissingRecurrenceEnd => "MISSING_RECURRENCE_END",
            IssueCode::InvalidRecurrenceEnd => "INVALID_RECURRENCE_END",
            IssueCode::InvalidRecurrenceEndFormat => "INVALID_RECURRENCE_END_FORMAT",
            IssueCode::InvalidRecurrenceDays => "INVALID_RECURRENCE_DAYS",
            IssueCode::InvalidRecurrenceInterval => "INVALID_RECURRENCE_INTERVAL",
            IssueCode::InvalidRecurrenceIntervalFormat => "INVALID_RECURRENCE_INTERVAL_FORMAT",
            IssueCode::Valid => "VALID",
        }
    }

    pub fn category(&self) -> IssueCategory {
        match self {
            IssueCode::MissingSite | IssueCode::MissingOwner => IssueCategory::Resolution,
            IssueCode::MissingRequired
            | IssueCode::InvalidDate
            | IssueCode::PastDate
            | IssueCode::InvalidDateRange
            | IssueCode::InvalidTime
            | IssueCode::InvalidHour
            | IssueCode::InvalidMinute
            | IssueCode::InvalidTimeRange => IssueCategory::Field,
            IssueCode::InvalidSite
            | IssueCode::InvalidFloor
            | IssueCode::FloorSiteMismatch
            | IssueCode::SpaceWithoutFloor
            | IssueCode::InvalidSpace
            | IssueCode::SpaceFloorMismatch
            | IssueCode::InvalidOwner => IssueCategory::Referential,
            IssueCode::DuplicateRow => IssueCategory::Duplicate,
            IssueCode::InvalidRecurrenceType
            | IssueCode::MissingRecurrenceEnd
            | IssueCode::InvalidRecurrenceEnd
            | IssueCode::InvalidRecurrenceEndFormat
            | IssueCode::InvalidRecurrenceDays
            | IssueCode::InvalidRecurrenceInterval
            | IssueCode::InvalidRecurrenceIntervalFormat => IssueCategory::Recurrence,
            IssueCode::Valid => IssueCategory::Valid,
        }
    }

    /// Codes after which the validator stops checking a row
    pub fn short_circuits(&self) -> bool {
        matches!(
            self,
            IssueCode::MissingSite | IssueCode::MissingOwner | IssueCode::MissingRequired
        )
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding for one row. Field names match the audit report columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub row_number: usize,
    pub status: IssueStatus,
    #[serde(rename = "issue_code")]
    pub code: IssueCode,
    #[serde(rename = "issue_detail")]
    pub detail: String,
    pub suggestion: String,
}

impl Issue {
    pub fn new(
        row_number: usize,
        status: IssueStatus,
        code: IssueCode,
        detail: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            row_number,
            status,
            code,
            detail: detail.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn error(row_number: usize, code: IssueCode, detail: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::new(row_number, IssueStatus::Error, code, detail, suggestion)
    }

    pub fn warn(row_number: usize, code: IssueCode, detail: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::new(row_number, IssueStatus::Warn, code, detail, suggestion)
    }

    pub fn valid(row_number: usize) -> Self {
        Self::new(row_number, IssueStatus::Ok, IssueCode::Valid, "Row is valid", "")
    }
}
