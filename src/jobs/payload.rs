//! Roster job payload assembly

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::dates::{parse_clock_value, parse_date};
use super::recurrence::{CompiledRecurrence, RecurrenceError, RecurrenceSpec, StopMode};
use super::resolver::RowResolver;
use super::row::{JobRow, present};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("row {row}: site could not be resolved ({reason})")]
    MissingSite { row: usize, reason: String },

    #[error("row {row}: owner could not be resolved ({reason})")]
    MissingOwner { row: usize, reason: String },

    #[error("row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid value '{value}' for '{field}'")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: {source}")]
    InvalidRecurrence {
        row: usize,
        #[source]
        source: RecurrenceError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub id: String,
    pub region_code: String,
    pub text: String,
}

/// `en_EN` and `nl_NL` entries carrying the same text. The web form sends
/// fixed Dutch placeholders ("Mijn titel", "Mijn omschrijving") instead; the
/// sheet has no Dutch columns, so the English text is repeated.
fn translations(text: &str) -> Vec<Translation> {
    ["en_EN", "nl_NL"]
        .iter()
        .enumerate()
        .map(|(i, region)| Translation {
            id: format!("new-{}", i),
            region_code: region.to_string(),
            text: text.to_string(),
        })
        .collect()
}

/// `floors_spaces`: an empty array, or `{floor_id: [space_id]}` when both are known
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FloorsSpaces {
    None(Vec<String>),
    Assigned(BTreeMap<String, Vec<String>>),
}

impl FloorsSpaces {
    pub fn new(floor: Option<&str>, space: Option<&str>) -> Self {
        match (floor, space) {
            (Some(floor), Some(space)) => {
                FloorsSpaces::Assigned(BTreeMap::from([(floor.to_string(), vec![space.to_string()])]))
            }
            _ => FloorsSpaces::None(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerRef {
    pub id: String,
}

/// Recurrence keys as flattened into the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecurrenceFields {
    OneOff {
        repeat_interval_length: u32,
        use_day_of_week: bool,
        frequency_daily_repeat: Vec<u8>,
        frequency_weekly_repeat: Vec<u8>,
        frequency_monthly_repeat: Vec<u8>,
        frequency_stop_repeat: Option<u8>,
        frequency_stop_repeat_number_value: Option<u32>,
        repeat_interval_period: Option<String>,
    },
    Recurring {
        repeat_interval_length: u32,
        use_day_of_week: bool,
        frequency_daily_repeat: Vec<u8>,
        frequency_weekly_repeat: Vec<u8>,
        frequency_monthly_repeat: Vec<u8>,
        frequency_stop_repeat: u8,
        repeat_interval_period: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        frequency_stop_repeat_number_value: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_after_date: Option<String>,
    },
}

impl RecurrenceFields {
    fn one_off() -> Self {
        RecurrenceFields::OneOff {
            repeat_interval_length: 1,
            use_day_of_week: false,
            frequency_daily_repeat: Vec::new(),
            frequency_weekly_repeat: Vec::new(),
            frequency_monthly_repeat: Vec::new(),
            frequency_stop_repeat: None,
            frequency_stop_repeat_number_value: None,
            repeat_interval_period: None,
        }
    }

    /// Exactly one stop field is emitted, matching the stop mode
    fn recurring(compiled: &CompiledRecurrence) -> Self {
        RecurrenceFields::Recurring {
            repeat_interval_length: compiled.interval_length,
            use_day_of_week: compiled.use_day_of_week,
            frequency_daily_repeat: compiled.daily_repeat.clone(),
            frequency_weekly_repeat: Vec::new(),
            frequency_monthly_repeat: Vec::new(),
            frequency_stop_repeat: compiled.stop.code(),
            repeat_interval_period: compiled.period.as_str().to_string(),
            frequency_stop_repeat_number_value: compiled.stop.count(),
            end_after_date: compiled.stop.date().map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Body of a roster job-create request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPayload {
    pub id: Option<String>,
    pub sequence_date: Option<String>,
    #[serde(rename = "editMode")]
    pub edit_mode: String,
    pub mode: String,
    pub translations: Vec<Translation>,
    pub description_translations: Vec<Translation>,
    pub date_start: String,
    pub date_end: String,
    pub hour_start: String,
    pub minute_start: String,
    pub hour_end: String,
    pub minute_end: String,
    pub locations: String,
    pub floors_spaces: FloorsSpaces,
    pub contracts: Vec<Value>,
    pub rate: Option<Value>,
    pub invoicable: bool,
    pub clock_hourtype_id: Option<Value>,
    pub duration_seconds: Option<u64>,
    pub owners: Vec<OwnerRef>,
    pub owner_roles: Vec<Value>,
    pub approvers: Vec<Value>,
    pub approver_roles: Vec<Value>,
    pub watchers: Vec<Value>,
    pub watcher_roles: Vec<Value>,
    pub subtasks: Vec<Value>,
    #[serde(rename = "contractSubtask")]
    pub contract_subtask: Option<Value>,
    #[serde(rename = "syncForms")]
    pub sync_forms: bool,
    pub labels: Vec<String>,
    #[serde(rename = "instruction-documents")]
    pub instruction_documents: Vec<Value>,
    #[serde(rename = "remove-instruction-documents")]
    pub remove_instruction_documents: Vec<Value>,
    pub task_sampling_select: Option<Value>,
    pub subtask_sampling_select: Option<Value>,
    #[serde(rename = "exception-mode")]
    pub exception_mode: u8,
    #[serde(rename = "excludeExceptions")]
    pub exclude_exceptions: String,
    pub task_complete_emails: bool,
    pub task_canceled_emails: bool,
    pub save_as_concept: bool,
    pub task_form_submission_id: Option<Value>,
    pub task_form_submission_visible: bool,
    #[serde(flatten)]
    pub recurrence: RecurrenceFields,
}

impl JobPayload {
    pub fn title(&self) -> &str {
        self.translations.first().map(|t| t.text.as_str()).unwrap_or("")
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.recurrence, RecurrenceFields::Recurring { .. })
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

fn required<'r>(row: &'r JobRow, field: &'static str) -> Result<&'r str, PayloadError> {
    row.field(field).ok_or(PayloadError::MissingField {
        row: row.row_number,
        field,
    })
}

fn iso_date(row: &JobRow, field: &'static str) -> Result<String, PayloadError> {
    let raw = required(row, field)?;
    parse_date(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| PayloadError::InvalidField {
            row: row.row_number,
            field,
            value: raw.to_string(),
        })
}

fn clock(row: &JobRow, field: &'static str) -> Result<String, PayloadError> {
    let raw = required(row, field)?;
    parse_clock_value(raw)
        .map(|v| v.to_string())
        .map_err(|_| PayloadError::InvalidField {
            row: row.row_number,
            field,
            value: raw.to_string(),
        })
}

/// Assemble the roster payload for one row.
///
/// Ids come from the resolver first and the raw id columns second. A row
/// whose site or owner stays unknown is refused rather than sent with blank
/// `locations` or `owners`.
pub fn build_job_payload(
    row: &JobRow,
    resolver: &RowResolver<'_>,
    recurrence: &RecurrenceSpec,
) -> Result<JobPayload, PayloadError> {
    let n = row.row_number;

    let site = resolver.resolve_site(row);
    let site_id = match site.id().or_else(|| present(&row.site_id)) {
        Some(id) => id.to_string(),
        None => {
            return Err(PayloadError::MissingSite {
                row: n,
                reason: site.error().unwrap_or("no site reference").to_string(),
            });
        }
    };

    let owner = resolver.resolve_owner(row);
    let owner_id = match owner.id().or_else(|| present(&row.owner_employee_id)) {
        Some(id) => id.to_string(),
        None => {
            return Err(PayloadError::MissingOwner {
                row: n,
                reason: owner.error().unwrap_or("no owner reference").to_string(),
            });
        }
    };

    let floor = resolver.resolve_floor(row, Some(site_id.as_str()));
    let floor_id = floor.id().or_else(|| present(&row.floor_id)).map(str::to_string);
    let space = resolver.resolve_space(row, floor_id.as_deref());
    let space_id = space.id().or_else(|| present(&row.space_id)).map(str::to_string);

    let title = required(row, "title_en")?;
    let description = present(&row.description_en).unwrap_or("");
    let date_start = iso_date(row, "date_start")?;

    let compiled = recurrence
        .compile()
        .map_err(|source| PayloadError::InvalidRecurrence { row: n, source })?;
    let (date_end, recurrence_fields, sequence_date, send_emails) = match &compiled {
        None => (date_start.clone(), RecurrenceFields::one_off(), None, true),
        Some(compiled) => {
            let date_end = match compiled.stop {
                StopMode::OnDate(stop) => stop.format("%Y-%m-%d").to_string(),
                _ => iso_date(row, "date_end")?,
            };
            (
                date_end,
                RecurrenceFields::recurring(compiled),
                Some(date_start.clone()),
                false,
            )
        }
    };

    Ok(JobPayload {
        id: None,
        sequence_date,
        edit_mode: "all".to_string(),
        mode: "roster".to_string(),
        translations: translations(title),
        description_translations: translations(description),
        date_start,
        date_end,
        hour_start: clock(row, "hour_start")?,
        minute_start: clock(row, "minute_start")?,
        hour_end: clock(row, "hour_end")?,
        minute_end: clock(row, "minute_end")?,
        locations: site_id,
        floors_spaces: FloorsSpaces::new(floor_id.as_deref(), space_id.as_deref()),
        contracts: Vec::new(),
        rate: None,
        invoicable: false,
        clock_hourtype_id: None,
        duration_seconds: None,
        owners: vec![OwnerRef { id: owner_id }],
        owner_roles: Vec::new(),
        approvers: Vec::new(),
        approver_roles: Vec::new(),
        watchers: Vec::new(),
        watcher_roles: Vec::new(),
        subtasks: Vec::new(),
        contract_subtask: None,
        sync_forms: false,
        labels: Vec::new(),
        instruction_documents: Vec::new(),
        remove_instruction_documents: Vec::new(),
        task_sampling_select: None,
        subtask_sampling_select: None,
        exception_mode: 0,
        exclude_exceptions: "1".to_string(),
        task_complete_emails: send_emails,
        task_canceled_emails: send_emails,
        save_as_concept: false,
        task_form_submission_id: None,
        task_form_submission_visible: false,
        recurrence: recurrence_fields,
    })
}

/// Payload for a sheet row, with the recurrence taken from its own columns
pub fn build_row_payload(row: &JobRow, resolver: &RowResolver<'_>) -> Result<JobPayload, PayloadError> {
    let recurrence = RecurrenceSpec::from_row(row)
        .map_err(|source| PayloadError::InvalidRecurrence { row: row.row_number, source })?;
    build_job_payload(row, resolver, &recurrence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::recurrence::Period;
    use crate::reference::{ReferenceData, ReferenceIndex};
    use chrono::NaiveDate;
    use serde_json::json;

    fn index() -> ReferenceIndex {
        ReferenceIndex::build(&ReferenceData {
            sites: vec![json!({"id": 1, "name": "Main Office"})],
            floors: vec![json!({"id": 10, "name": "Ground", "siteId": 1})],
            spaces: vec![json!({"id": 100, "name": "Kitchen", "floorId": 10})],
            users: vec![json!({"id": 7, "user_name": "alice", "email": "a@x.com"})],
        })
    }

    fn row() -> JobRow {
        JobRow {
            row_number: 2,
            title_en: Some("Clean".into()),
            description_en: Some("Mop floors".into()),
            site_name: Some("Main Office".into()),
            owner_email: Some("a@x.com".into()),
            date_start: Some("2025-03-03".into()),
            date_end: Some("2025-03-10".into()),
            hour_start: Some("9.0".into()),
            minute_start: Some("0".into()),
            hour_end: Some("17".into()),
            minute_end: Some("30".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_off_payload() {
        let index = index();
        let resolver = RowResolver::new(&index);
        let payload = build_job_payload(&row(), &resolver, &RecurrenceSpec::one_off()).unwrap();
        let value = payload.to_value().unwrap();

        assert_eq!(value["date_end"], "2025-03-03");
        assert_eq!(value["sequence_date"], Value::Null);
        assert_eq!(value["hour_start"], "9");
        assert_eq!(value["minute_end"], "30");
        assert_eq!(value["locations"], "1");
        assert_eq!(value["owners"], json!([{"id": "7"}]));
        assert_eq!(value["floors_spaces"], json!([]));
        assert_eq!(value["task_complete_emails"], true);
        assert_eq!(value["frequency_stop_repeat"], Value::Null);
        assert_eq!(value["frequency_stop_repeat_number_value"], Value::Null);
        assert_eq!(value["repeat_interval_period"], Value::Null);
        assert_eq!(value["editMode"], "all");
        assert_eq!(value["exception-mode"], 0);
        assert_eq!(value["translations"][1]["regionCode"], "nl_NL");
        assert_eq!(value["description_translations"][0]["text"], "Mop floors");
        assert!(value.get("end_after_date").is_none());
    }

    #[test]
    fn test_floors_spaces_only_with_both() {
        let index = index();
        let resolver = RowResolver::new(&index);

        let mut floor_only = row();
        floor_only.floor_name = Some("Ground".into());
        let payload = build_job_payload(&floor_only, &resolver, &RecurrenceSpec::one_off()).unwrap();
        assert_eq!(payload.floors_spaces, FloorsSpaces::None(Vec::new()));

        let mut both = floor_only.clone();
        both.space_name = Some("Kitchen".into());
        let value = build_job_payload(&both, &resolver, &RecurrenceSpec::one_off())
            .unwrap()
            .to_value()
            .unwrap();
        assert_eq!(value["floors_spaces"], json!({"10": ["100"]}));
    }

    #[test]
    fn test_recurring_after_count() {
        let index = index();
        let resolver = RowResolver::new(&index);
        let spec = RecurrenceSpec::repeating(Period::Weekly)
            .on_days([1, 3])
            .ending(StopMode::AfterCount(10));
        let value = build_job_payload(&row(), &resolver, &spec).unwrap().to_value().unwrap();

        assert_eq!(value["sequence_date"], "2025-03-03");
        assert_eq!(value["date_end"], "2025-03-10");
        assert_eq!(value["repeat_interval_period"], "daily");
        assert_eq!(value["frequency_daily_repeat"], json!([1, 3]));
        assert_eq!(value["frequency_stop_repeat"], 1);
        assert_eq!(value["frequency_stop_repeat_number_value"], 10);
        assert_eq!(value["task_canceled_emails"], false);
        assert!(value.get("end_after_date").is_none());
    }

    #[test]
    fn test_recurring_never_has_no_stop_value() {
        let index = index();
        let resolver = RowResolver::new(&index);
        let spec = RecurrenceSpec::repeating(Period::Monthly);
        let value = build_job_payload(&row(), &resolver, &spec).unwrap().to_value().unwrap();

        assert_eq!(value["frequency_stop_repeat"], 0);
        assert!(value.get("frequency_stop_repeat_number_value").is_none());
        assert!(value.get("end_after_date").is_none());
    }

    #[test]
    fn test_recurring_on_date_uses_stop_as_end() {
        let index = index();
        let resolver = RowResolver::new(&index);
        let stop = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let spec = RecurrenceSpec::repeating(Period::Daily).ending(StopMode::OnDate(stop));
        let value = build_job_payload(&row(), &resolver, &spec).unwrap().to_value().unwrap();

        assert_eq!(value["end_after_date"], "2025-12-31");
        assert_eq!(value["date_end"], "2025-12-31");
        assert!(value.get("frequency_stop_repeat_number_value").is_none());
    }

    #[test]
    fn test_falls_back_to_raw_id_columns() {
        let index = index();
        let resolver = RowResolver::new(&index);
        let mut raw = row();
        raw.site_name = None;
        raw.site_id = Some("55".into());
        raw.owner_email = None;
        raw.owner_employee_id = Some("66".into());

        let payload = build_job_payload(&raw, &resolver, &RecurrenceSpec::one_off()).unwrap();
        assert_eq!(payload.locations, "55");
        assert_eq!(payload.owners, vec![OwnerRef { id: "66".into() }]);
    }

    #[test]
    fn test_refuses_unresolved_site_and_owner() {
        let index = index();
        let resolver = RowResolver::new(&index);

        let mut no_site = row();
        no_site.site_name = Some("Nowhere".into());
        let err = build_job_payload(&no_site, &resolver, &RecurrenceSpec::one_off()).unwrap_err();
        assert!(matches!(err, PayloadError::MissingSite { row: 2, .. }));

        let mut no_owner = row();
        no_owner.owner_email = Some("ghost@x.com".into());
        let err = build_job_payload(&no_owner, &resolver, &RecurrenceSpec::one_off()).unwrap_err();
        assert!(matches!(err, PayloadError::MissingOwner { .. }));
    }

    #[test]
    fn test_row_payload_reads_recurrence_columns() {
        let index = index();
        let resolver = RowResolver::new(&index);
        let mut weekly = row();
        weekly.recurrence_type = Some("weekly".into());
        weekly.recurrence_days = Some("Tue,Thu".into());
        weekly.recurrence_end_date = Some("2025-06-30".into());

        let payload = build_row_payload(&weekly, &resolver).unwrap();
        assert!(payload.is_recurring());
        let value = payload.to_value().unwrap();
        assert_eq!(value["frequency_daily_repeat"], json!([2, 4]));
        assert_eq!(value["end_after_date"], "2025-06-30");

        weekly.recurrence_days = Some("Xyz".into());
        assert!(matches!(
            build_row_payload(&weekly, &resolver),
            Err(PayloadError::InvalidRecurrence { .. })
        ));
    }

    #[test]
    fn test_row_payload_rejects_oversized_interval() {
        let index = index();
        let resolver = RowResolver::new(&index);
        let mut biweekly = row();
        biweekly.recurrence_type = Some("biweekly".into());
        biweekly.recurrence_days = Some("Mon".into());
        biweekly.recurrence_interval = Some("3000000000".into());
        biweekly.recurrence_end_date = Some("2025-06-30".into());

        let err = build_row_payload(&biweekly, &resolver).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidRecurrence { row: 2, .. }));

        biweekly.recurrence_interval = Some("999".into());
        let value = build_row_payload(&biweekly, &resolver).unwrap().to_value().unwrap();
        assert_eq!(value["repeat_interval_length"], json!(1998));
    }
}
