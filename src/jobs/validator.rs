//! Row validation
//!
//! Checks run in a fixed order and issues are appended as they are found, so
//! the first issue of a row is the most actionable one. Rows missing a site,
//! an owner or a required field stop after the presence checks.

use chrono::NaiveDate;
use chrono_tz::Tz;
use log::debug;
use std::collections::HashSet;

use crate::reference::{EntityKind, ReferenceIndex};

use super::dates::{DEFAULT_TIMEZONE, parse_clock_value, parse_date, today_in};
use super::issue::{Issue, IssueCode, IssueStatus};
use super::recurrence::{MAX_INTERVAL, RecurrenceType, day_prefix, parse_day_token};
use super::resolver::{Resolution, RowResolver};
use super::row::{JobRow, ResolvedIds, present};

pub const REQUIRED_FIELDS: [&str; 7] = [
    "title_en",
    "date_start",
    "date_end",
    "hour_start",
    "minute_start",
    "hour_end",
    "minute_end",
];

/// Batch-scoped set of row keys already seen, used to flag duplicates
#[derive(Debug, Default, Clone)]
pub struct DuplicateTracker {
    seen: HashSet<DuplicateKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DuplicateKey {
    site: String,
    floor: String,
    space: String,
    title: String,
    date_start: String,
    hour_start: String,
    minute_start: String,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the row; returns `true` when an identical key was already seen
    fn check(&mut self, row: &JobRow, ids: &ResolvedIds) -> bool {
        let raw = |value: &Option<String>| value.as_deref().unwrap_or("").trim().to_string();
        let key = DuplicateKey {
            site: ids.site.clone().unwrap_or_default(),
            floor: ids.floor.clone().unwrap_or_default(),
            space: ids.space.clone().unwrap_or_default(),
            title: raw(&row.title_en),
            date_start: raw(&row.date_start),
            hour_start: raw(&row.hour_start),
            minute_start: raw(&row.minute_start),
        };
        !self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Issues and resolved ids of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowValidation {
    pub row_number: usize,
    pub issues: Vec<Issue>,
    pub resolved: ResolvedIds,
}

impl RowValidation {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.status.is_blocking())
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    pub fn worst_status(&self) -> IssueStatus {
        self.issues
            .iter()
            .map(|i| i.status)
            .max()
            .unwrap_or(IssueStatus::Ok)
    }
}

pub struct JobValidator<'a> {
    index: &'a ReferenceIndex,
    resolver: RowResolver<'a>,
    today: NaiveDate,
}

impl<'a> JobValidator<'a> {
    /// Validator evaluating "today" in the default zone
    pub fn new(index: &'a ReferenceIndex) -> Self {
        Self::for_timezone(index, DEFAULT_TIMEZONE)
    }

    pub fn for_timezone(index: &'a ReferenceIndex, tz: Tz) -> Self {
        Self::with_today(index, today_in(tz))
    }

    /// Validator with a fixed "today", for reproducible runs
    pub fn with_today(index: &'a ReferenceIndex, today: NaiveDate) -> Self {
        Self {
            index,
            resolver: RowResolver::new(index),
            today,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn validate_rows(&self, rows: &[JobRow]) -> Vec<RowValidation> {
        let mut tracker = DuplicateTracker::new();
        rows.iter()
            .map(|row| self.validate_row(row, &mut tracker))
            .collect()
    }

    pub fn validate_row(&self, row: &JobRow, tracker: &mut DuplicateTracker) -> RowValidation {
        let n = row.row_number;
        let mut issues = Vec::new();
        let mut ids = ResolvedIds::default();

        match self.resolver.resolve_site(row) {
            Resolution::Resolved(id) => ids.site = Some(id),
            Resolution::Failed(message) => issues.push(Issue::error(
                n,
                IssueCode::MissingSite,
                message,
                "Provide site_id or site_name",
            )),
            Resolution::Absent => {}
        }

        match self.resolver.resolve_owner(row) {
            Resolution::Resolved(id) => ids.owner = Some(id),
            Resolution::Failed(message) => issues.push(Issue::error(
                n,
                IssueCode::MissingOwner,
                message,
                "Provide owner_employee_id, owner_name, or owner_email",
            )),
            Resolution::Absent => {}
        }

        let mut floor_failed = false;
        if let Some(site) = ids.site.as_deref() {
            match self.resolver.resolve_floor(row, Some(site)) {
                Resolution::Resolved(id) => ids.floor = Some(id),
                Resolution::Failed(message) => {
                    floor_failed = true;
                    issues.push(Issue::error(
                        n,
                        IssueCode::InvalidFloor,
                        message,
                        "Check floor_id or floor_name",
                    ));
                }
                Resolution::Absent => {}
            }
        }

        // A space is resolved unless its floor was given but could not be found
        if ids.site.is_some() && !floor_failed {
            match self.resolver.resolve_space(row, ids.floor.as_deref()) {
                Resolution::Resolved(id) => ids.space = Some(id),
                Resolution::Failed(message) => issues.push(Issue::error(
                    n,
                    IssueCode::InvalidSpace,
                    message,
                    "Check space_id or space_name",
                )),
                Resolution::Absent => {}
            }
        }

        for field in REQUIRED_FIELDS {
            if row.field(field).is_none() {
                issues.push(Issue::error(
                    n,
                    IssueCode::MissingRequired,
                    format!("Missing required field: {}", field),
                    format!("Provide a value for {}", field),
                ));
            }
        }

        if issues.iter().any(|i| i.code.short_circuits()) {
            debug!("Row {}: stopping after {} presence issue(s)", n, issues.len());
            return RowValidation { row_number: n, issues, resolved: ids };
        }

        self.check_dates(row, &mut issues);
        self.check_times(row, &mut issues);
        self.check_references(row, &ids, &mut issues);

        if tracker.check(row, &ids) {
            issues.push(Issue::warn(
                n,
                IssueCode::DuplicateRow,
                "Duplicate job found in file (same site/floor/space/title/date/time)",
                "Review if intentional",
            ));
        }

        self.check_recurrence(row, &mut issues);

        if issues.is_empty() {
            issues.push(Issue::valid(n));
        }

        RowValidation { row_number: n, issues, resolved: ids }
    }

    fn check_dates(&self, row: &JobRow, issues: &mut Vec<Issue>) {
        let n = row.row_number;
        let start = parse_date(row.field("date_start").unwrap_or(""));
        let end = parse_date(row.field("date_end").unwrap_or(""));

        let (start, end) = match (start, end) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(e), _) | (_, Err(e)) => {
                issues.push(Issue::error(
                    n,
                    IssueCode::InvalidDate,
                    format!("Date parsing error: {}", e),
                    "Use YYYY-MM-DD format",
                ));
                return;
            }
        };

        if start < self.today {
            issues.push(Issue::error(
                n,
                IssueCode::PastDate,
                format!("date_start {} is in the past", start),
                format!("Use date >= {}", self.today),
            ));
        }

        if end < start {
            issues.push(Issue::error(
                n,
                IssueCode::InvalidDateRange,
                format!("date_end {} before date_start {}", end, start),
                "Set date_end >= date_start",
            ));
        }
    }

    fn check_times(&self, row: &JobRow, issues: &mut Vec<Issue>) {
        let n = row.row_number;
        let parsed: Result<Vec<i64>, _> = ["hour_start", "minute_start", "hour_end", "minute_end"]
            .iter()
            .map(|field| parse_clock_value(row.field(field).unwrap_or("")))
            .collect();

        let values = match parsed {
            Ok(values) => values,
            Err(e) => {
                issues.push(Issue::error(
                    n,
                    IssueCode::InvalidTime,
                    format!("Time parsing error: {}", e),
                    "Use integer values for hours/minutes",
                ));
                return;
            }
        };
        let [hour_start, minute_start, hour_end, minute_end] = [values[0], values[1], values[2], values[3]];

        for (name, value) in [("hour_start", hour_start), ("hour_end", hour_end)] {
            if !(0..=23).contains(&value) {
                issues.push(Issue::error(
                    n,
                    IssueCode::InvalidHour,
                    format!("{} {} out of range", name, value),
                    "Use 0-23",
                ));
            }
        }

        for (name, value) in [("minute_start", minute_start), ("minute_end", minute_end)] {
            if !(0..=59).contains(&value) {
                issues.push(Issue::error(
                    n,
                    IssueCode::InvalidMinute,
                    format!("{} {} out of range", name, value),
                    "Use 0-59",
                ));
            }
        }

        // Same-day only: an end at or before the start is never "next day"
        let minutes_of_day = |hour: i64, minute: i64| hour.saturating_mul(60).saturating_add(minute);
        if minutes_of_day(hour_end, minute_end) <= minutes_of_day(hour_start, minute_start) {
            issues.push(Issue::error(
                n,
                IssueCode::InvalidTimeRange,
                format!(
                    "End time ({:02}:{:02}) must be after start ({:02}:{:02})",
                    hour_end, minute_end, hour_start, minute_start
                ),
                "Set end_time > start_time",
            ));
        }
    }

    fn check_references(&self, row: &JobRow, ids: &ResolvedIds, issues: &mut Vec<Issue>) {
        let n = row.row_number;

        if let Some(site) = ids.site.as_deref() {
            if !self.index.contains(EntityKind::Site, site) {
                issues.push(Issue::error(
                    n,
                    IssueCode::InvalidSite,
                    format!("Resolved site_id {} not found in system", site),
                    "Check site reference",
                ));
            }
        }

        if let (Some(floor), Some(site)) = (ids.floor.as_deref(), ids.site.as_deref()) {
            if !self.index.contains(EntityKind::Floor, floor) {
                issues.push(Issue::error(
                    n,
                    IssueCode::InvalidFloor,
                    format!("Resolved floor_id {} not found", floor),
                    "Check floor reference",
                ));
            } else {
                let expected = self.index.parent_of(EntityKind::Floor, floor);
                if expected != Some(site) {
                    issues.push(Issue::error(
                        n,
                        IssueCode::FloorSiteMismatch,
                        "Floor does not belong to specified site",
                        format!("Floor belongs to site {}", expected.unwrap_or("unknown")),
                    ));
                }
            }
        }

        if let Some(space) = ids.space.as_deref() {
            match ids.floor.as_deref() {
                None => issues.push(Issue::error(
                    n,
                    IssueCode::SpaceWithoutFloor,
                    "Space provided without floor",
                    "Provide floor when specifying space",
                )),
                Some(_) if !self.index.contains(EntityKind::Space, space) => issues.push(Issue::error(
                    n,
                    IssueCode::InvalidSpace,
                    format!("Resolved space_id {} not found", space),
                    "Check space reference",
                )),
                Some(floor) => {
                    let expected = self.index.parent_of(EntityKind::Space, space);
                    if expected != Some(floor) {
                        issues.push(Issue::error(
                            n,
                            IssueCode::SpaceFloorMismatch,
                            "Space does not belong to specified floor",
                            format!("Space belongs to floor {}", expected.unwrap_or("unknown")),
                        ));
                    }
                }
            }
        }

        if let Some(owner) = ids.owner.as_deref() {
            if !self.index.contains(EntityKind::User, owner) {
                issues.push(Issue::error(
                    n,
                    IssueCode::InvalidOwner,
                    format!("Resolved owner_id {} not found in system", owner),
                    "Check owner reference",
                ));
            }
        }
    }

    fn check_recurrence(&self, row: &JobRow, issues: &mut Vec<Issue>) {
        let n = row.row_number;
        let Some(kind) = row.recurrence_kind() else {
            return;
        };

        let parsed_kind = kind.parse::<RecurrenceType>().ok();
        if parsed_kind.is_none() {
            issues.push(Issue::error(
                n,
                IssueCode::InvalidRecurrenceType,
                format!("recurrence_type '{}' is invalid", kind),
                format!(
                    "Use one of: {}, or leave empty for one-off",
                    RecurrenceType::valid_list()
                ),
            ));
        }

        match present(&row.recurrence_end_date) {
            None => issues.push(Issue::error(
                n,
                IssueCode::MissingRecurrenceEnd,
                "recurrence_end_date required for recurring jobs",
                "Provide end date (YYYY-MM-DD) or set recurrence_type to 'none'",
            )),
            Some(raw) => match parse_date(raw) {
                Ok(end) => {
                    // An unparsable start was already reported as INVALID_DATE
                    if let Ok(start) = parse_date(row.field("date_start").unwrap_or("")) {
                        if end <= start {
                            issues.push(Issue::error(
                                n,
                                IssueCode::InvalidRecurrenceEnd,
                                format!("recurrence_end_date {} must be after date_start {}", end, start),
                                "Set end date > start date",
                            ));
                        }
                    }
                }
                Err(e) => issues.push(Issue::error(
                    n,
                    IssueCode::InvalidRecurrenceEndFormat,
                    format!("Invalid recurrence_end_date format: {}", e),
                    "Use YYYY-MM-DD format",
                )),
            },
        }

        if parsed_kind.is_some_and(|k| k.uses_days()) {
            if let Some(raw) = present(&row.recurrence_days) {
                let invalid: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .filter(|t| parse_day_token(t).is_none())
                    .map(day_prefix)
                    .collect();
                if !invalid.is_empty() {
                    issues.push(Issue::error(
                        n,
                        IssueCode::InvalidRecurrenceDays,
                        format!("Invalid day(s): {}", invalid.join(", ")),
                        "Use: Mon, Tue, Wed, Thu, Fri, Sat, Sun (comma-separated)",
                    ));
                }
            }
        }

        if let Some(raw) = present(&row.recurrence_interval) {
            match parse_clock_value(raw) {
                Ok(interval) if interval < 1 => issues.push(Issue::error(
                    n,
                    IssueCode::InvalidRecurrenceInterval,
                    format!("recurrence_interval {} must be >= 1", interval),
                    "Use positive integer (1, 2, 3, etc.)",
                )),
                Ok(interval) if interval > i64::from(MAX_INTERVAL) => issues.push(Issue::error(
                    n,
                    IssueCode::InvalidRecurrenceInterval,
                    format!("recurrence_interval {} exceeds {}", interval, MAX_INTERVAL),
                    format!("Use a value between 1 and {}", MAX_INTERVAL),
                )),
                Ok(_) => {}
                Err(_) => issues.push(Issue::error(
                    n,
                    IssueCode::InvalidRecurrenceIntervalFormat,
                    "recurrence_interval must be an integer",
                    "Use whole numbers (1, 2, 3, etc.)",
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceData;
    use serde_json::json;

    fn index() -> ReferenceIndex {
        ReferenceIndex::build(&ReferenceData {
            sites: vec![json!({"id": 1, "name": "Main Office"}), json!({"id": 2, "name": "Depot"})],
            floors: vec![
                json!({"id": 10, "name": "Ground", "siteId": 1}),
                json!({"id": 20, "name": "Yard", "siteId": 2}),
            ],
            spaces: vec![
                json!({"id": 100, "name": "Kitchen", "floorId": 10}),
                json!({"id": 200, "name": "Gate", "floorId": 20}),
            ],
            users: vec![json!({"id": 7, "user_name": "alice", "email": "a@x.com"})],
        })
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn valid_row() -> JobRow {
        JobRow {
            row_number: 2,
            title_en: Some("Clean".into()),
            site_name: Some("Main Office".into()),
            floor_name: Some("Ground".into()),
            space_name: Some("Kitchen".into()),
            owner_email: Some("a@x.com".into()),
            date_start: Some("2025-02-01".into()),
            date_end: Some("2025-02-01".into()),
            hour_start: Some("9".into()),
            minute_start: Some("0".into()),
            hour_end: Some("17".into()),
            minute_end: Some("0".into()),
            ..Default::default()
        }
    }

    fn codes(validation: &RowValidation) -> Vec<IssueCode> {
        validation.issues.iter().map(|i| i.code).collect()
    }

    fn validate(row: &JobRow) -> RowValidation {
        let index = index();
        let validator = JobValidator::with_today(&index, today());
        validator.validate_row(row, &mut DuplicateTracker::new())
    }

    #[test]
    fn test_valid_row() {
        let result = validate(&valid_row());
        assert_eq!(codes(&result), vec![IssueCode::Valid]);
        assert_eq!(result.resolved.site.as_deref(), Some("1"));
        assert_eq!(result.resolved.floor.as_deref(), Some("10"));
        assert_eq!(result.resolved.space.as_deref(), Some("100"));
        assert_eq!(result.resolved.owner.as_deref(), Some("7"));
        assert!(!result.has_errors());
    }

    #[test]
    fn test_missing_required_short_circuits() {
        let mut row = valid_row();
        row.title_en = None;
        row.hour_start = Some("25".into());

        let result = validate(&row);
        assert_eq!(codes(&result), vec![IssueCode::MissingRequired]);
        assert_eq!(result.issues[0].detail, "Missing required field: title_en");
    }

    #[test]
    fn test_invalid_date() {
        let mut row = valid_row();
        row.date_end = Some("someday".into());

        assert_eq!(codes(&validate(&row)), vec![IssueCode::InvalidDate]);
    }

    #[test]
    fn test_date_range() {
        let mut row = valid_row();
        row.date_end = Some("2025-01-15".into());

        assert_eq!(codes(&validate(&row)), vec![IssueCode::InvalidDateRange]);
    }

    #[test]
    fn test_hour_and_minute_ranges() {
        let mut row = valid_row();
        row.hour_end = Some("24".into());
        row.minute_start = Some("60".into());

        let result = validate(&row);
        assert_eq!(
            codes(&result),
            vec![IssueCode::InvalidHour, IssueCode::InvalidMinute]
        );
        assert_eq!(result.issues[0].detail, "hour_end 24 out of range");
    }

    #[test]
    fn test_extreme_clock_values() {
        let mut row = valid_row();
        row.hour_end = Some("9223372036854775807".into());
        assert_eq!(codes(&validate(&row)), vec![IssueCode::InvalidHour]);

        row.hour_end = Some("17".into());
        row.hour_start = Some("9223372036854775807".into());
        row.minute_start = Some("9223372036854775807".into());
        assert_eq!(
            codes(&validate(&row)),
            vec![IssueCode::InvalidHour, IssueCode::InvalidMinute, IssueCode::InvalidTimeRange]
        );

        let mut row = valid_row();
        row.hour_start = Some("-9223372036854775808".into());
        row.minute_end = Some("1e18".into());
        let result = validate(&row);
        assert_eq!(
            codes(&result),
            vec![IssueCode::InvalidHour, IssueCode::InvalidMinute]
        );
    }

    #[test]
    fn test_extreme_serial_dates() {
        let mut row = valid_row();
        row.date_start = Some("1e300".into());
        assert_eq!(codes(&validate(&row)), vec![IssueCode::InvalidDate]);

        let mut row = valid_row();
        row.date_end = Some("999999999999999".into());
        assert_eq!(codes(&validate(&row)), vec![IssueCode::InvalidDate]);
    }

    #[test]
    fn test_interval_beyond_limit() {
        let mut row = valid_row();
        row.recurrence_type = Some("biweekly".into());
        row.recurrence_days = Some("Mon".into());
        row.recurrence_end_date = Some("2025-06-01".into());
        row.recurrence_interval = Some("3000000000".into());

        let result = validate(&row);
        assert_eq!(codes(&result), vec![IssueCode::InvalidRecurrenceInterval]);
        assert!(result.issues[0].detail.contains("exceeds 999"));

        row.recurrence_interval = Some("999".into());
        assert_eq!(codes(&validate(&row)), vec![IssueCode::Valid]);
    }

    #[test]
    fn test_non_integer_time() {
        let mut row = valid_row();
        row.minute_end = Some("half past".into());

        assert_eq!(codes(&validate(&row)), vec![IssueCode::InvalidTime]);
    }

    #[test]
    fn test_unknown_explicit_ids() {
        let mut row = valid_row();
        row.site_id = Some("99".into());
        row.floor_name = None;
        row.space_name = None;
        row.owner_employee_id = Some("42".into());

        assert_eq!(
            codes(&validate(&row)),
            vec![IssueCode::InvalidSite, IssueCode::InvalidOwner]
        );
    }

    #[test]
    fn test_floor_site_mismatch() {
        let mut row = valid_row();
        row.floor_name = None;
        row.space_name = None;
        row.floor_id = Some("20".into());

        let result = validate(&row);
        assert_eq!(codes(&result), vec![IssueCode::FloorSiteMismatch]);
        assert_eq!(result.issues[0].suggestion, "Floor belongs to site 2");
    }

    #[test]
    fn test_space_floor_mismatch() {
        let mut row = valid_row();
        row.space_name = None;
        row.space_id = Some("200".into());

        let result = validate(&row);
        assert_eq!(codes(&result), vec![IssueCode::SpaceFloorMismatch]);
        assert_eq!(result.issues[0].suggestion, "Space belongs to floor 20");
    }

    #[test]
    fn test_space_without_floor() {
        let mut row = valid_row();
        row.floor_name = None;

        assert_eq!(codes(&validate(&row)), vec![IssueCode::SpaceWithoutFloor]);
    }

    #[test]
    fn test_unresolvable_floor_skips_space() {
        let mut row = valid_row();
        row.floor_name = Some("Roof".into());

        let result = validate(&row);
        assert_eq!(codes(&result), vec![IssueCode::InvalidFloor]);
        assert_eq!(result.resolved.space, None);
    }

    #[test]
    fn test_recurrence_checks() {
        let mut row = valid_row();
        row.recurrence_type = Some("weekly".into());
        row.recurrence_days = Some("Mon,Wed,Xyz".into());
        row.recurrence_interval = Some("two".into());

        let result = validate(&row);
        assert_eq!(
            codes(&result),
            vec![
                IssueCode::MissingRecurrenceEnd,
                IssueCode::InvalidRecurrenceDays,
                IssueCode::InvalidRecurrenceIntervalFormat,
            ]
        );
        assert!(result.issues[1].detail.contains("xyz"));
    }

    #[test]
    fn test_recurrence_end_checks() {
        let mut row = valid_row();
        row.recurrence_type = Some("daily".into());
        row.recurrence_end_date = Some("2025-02-01".into());
        row.recurrence_interval = Some("0".into());
        assert_eq!(
            codes(&validate(&row)),
            vec![IssueCode::InvalidRecurrenceEnd, IssueCode::InvalidRecurrenceInterval]
        );

        row.recurrence_end_date = Some("never".into());
        row.recurrence_interval = None;
        assert_eq!(codes(&validate(&row)), vec![IssueCode::InvalidRecurrenceEndFormat]);
    }

    #[test]
    fn test_invalid_recurrence_type_still_checks_end() {
        let mut row = valid_row();
        row.recurrence_type = Some("hourly".into());

        let result = validate(&row);
        assert_eq!(
            codes(&result),
            vec![IssueCode::InvalidRecurrenceType, IssueCode::MissingRecurrenceEnd]
        );
        assert!(result.issues[0].suggestion.contains("weekdays"));
    }

    #[test]
    fn test_none_recurrence_type_ignored() {
        let mut row = valid_row();
        row.recurrence_type = Some("None".into());
        row.recurrence_days = Some("garbage".into());

        assert_eq!(codes(&validate(&row)), vec![IssueCode::Valid]);
    }

    #[test]
    fn test_duplicates_are_batch_scoped() {
        let index = index();
        let validator = JobValidator::with_today(&index, today());
        let first = valid_row();
        let mut second = valid_row();
        second.row_number = 3;

        let results = validator.validate_rows(&[first, second]);
        assert_eq!(codes(&results[0]), vec![IssueCode::Valid]);
        assert_eq!(codes(&results[1]), vec![IssueCode::DuplicateRow]);
        assert_eq!(results[1].worst_status(), IssueStatus::Warn);
        assert!(!results[1].has_errors());
    }
}
