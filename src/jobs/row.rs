//! One job record of an import sheet

use serde::{Deserialize, Serialize};

/// A row of the job sheet exactly as entered.
///
/// Every column is optional at this level; presence rules are enforced by the
/// validator. Cells are kept as text so the audit can report what the author
/// actually typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRow {
    /// Spreadsheet row number (the header is row 1)
    #[serde(skip)]
    pub row_number: usize,

    pub title_en: Option<String>,
    pub description_en: Option<String>,

    pub site_id: Option<String>,
    pub site_name: Option<String>,
    pub floor_id: Option<String>,
    pub floor_name: Option<String>,
    pub space_id: Option<String>,
    pub space_name: Option<String>,

    pub owner_employee_id: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,

    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub hour_start: Option<String>,
    pub minute_start: Option<String>,
    pub hour_end: Option<String>,
    pub minute_end: Option<String>,

    pub is_recurring: Option<String>,
    pub recurrence_type: Option<String>,
    pub recurrence_days: Option<String>,
    pub recurrence_interval: Option<String>,
    pub recurrence_end_date: Option<String>,
}

impl JobRow {
    /// Trimmed value of a named column, `None` when absent or blank
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "title_en" => &self.title_en,
            "description_en" => &self.description_en,
            "site_id" => &self.site_id,
            "site_name" => &self.site_name,
            "floor_id" => &self.floor_id,
            "floor_name" => &self.floor_name,
            "space_id" => &self.space_id,
            "space_name" => &self.space_name,
            "owner_employee_id" => &self.owner_employee_id,
            "owner_name" => &self.owner_name,
            "owner_email" => &self.owner_email,
            "date_start" => &self.date_start,
            "date_end" => &self.date_end,
            "hour_start" => &self.hour_start,
            "minute_start" => &self.minute_start,
            "hour_end" => &self.hour_end,
            "minute_end" => &self.minute_end,
            "is_recurring" => &self.is_recurring,
            "recurrence_type" => &self.recurrence_type,
            "recurrence_days" => &self.recurrence_days,
            "recurrence_interval" => &self.recurrence_interval,
            "recurrence_end_date" => &self.recurrence_end_date,
            _ => return None,
        };
        present(value)
    }

    pub fn title(&self) -> &str {
        present(&self.title_en).unwrap_or("")
    }

    /// Explicit `is_recurring` flag, `None` when the column is blank or unreadable
    pub fn recurring_flag(&self) -> Option<bool> {
        let value = present(&self.is_recurring)?.to_lowercase();
        match value.as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        }
    }

    /// Lower-cased recurrence type, `None` for blank or `none`
    pub fn recurrence_kind(&self) -> Option<String> {
        let value = present(&self.recurrence_type)?.to_lowercase();
        if value == "none" { None } else { Some(value) }
    }
}

/// Resolved foreign-system ids for one row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedIds {
    pub site: Option<String>,
    pub floor: Option<String>,
    pub space: Option<String>,
    pub owner: Option<String>,
}

/// A row together with the ids resolved for it; the row itself is never mutated
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRow<'a> {
    pub row: &'a JobRow,
    pub ids: ResolvedIds,
}

impl<'a> ResolvedRow<'a> {
    pub fn new(row: &'a JobRow, ids: ResolvedIds) -> Self {
        Self { row, ids }
    }
}

/// Trimmed, non-blank cell content
pub fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_trims_and_blanks() {
        let row = JobRow {
            title_en: Some("  Clean lobby ".into()),
            site_id: Some("   ".into()),
            ..Default::default()
        };

        assert_eq!(row.field("title_en"), Some("Clean lobby"));
        assert_eq!(row.field("site_id"), None);
        assert_eq!(row.field("site_name"), None);
        assert_eq!(row.field("no_such_column"), None);
    }

    #[test]
    fn test_recurring_flag() {
        let mut row = JobRow::default();
        assert_eq!(row.recurring_flag(), None);

        row.is_recurring = Some("FALSE".into());
        assert_eq!(row.recurring_flag(), Some(false));

        row.is_recurring = Some("yes".into());
        assert_eq!(row.recurring_flag(), Some(true));

        row.is_recurring = Some("maybe".into());
        assert_eq!(row.recurring_flag(), None);
    }

    #[test]
    fn test_recurrence_kind() {
        let mut row = JobRow::default();
        assert_eq!(row.recurrence_kind(), None);

        row.recurrence_type = Some(" None ".into());
        assert_eq!(row.recurrence_kind(), None);

        row.recurrence_type = Some("Weekly".into());
        assert_eq!(row.recurrence_kind().as_deref(), Some("weekly"));
    }
}
