//! The state of one interactive import: reference data, loaded rows and the
//! last validation pass. Owned by the caller and passed explicitly to each
//! step; loading new data invalidates the validation results.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use chrono_tz::Tz;
use log::info;
use serde::Serialize;

use crate::jobs::{Issue, IssueStatus, JobRow, JobSheet, JobValidator, RowResolver, RowValidation};
use crate::reference::{ReferenceData, ReferenceIndex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total_rows: usize,
    pub ready_rows: usize,
    pub error_rows: usize,
    pub warn_rows: usize,
    pub error_issues: usize,
    pub warn_issues: usize,
}

#[derive(Debug)]
pub struct ImportSession {
    tz: Tz,
    today: Option<NaiveDate>,
    reference: Option<ReferenceData>,
    index: Option<ReferenceIndex>,
    sheet: Option<JobSheet>,
    validations: Vec<RowValidation>,
}

impl ImportSession {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            today: None,
            reference: None,
            index: None,
            sheet: None,
            validations: Vec::new(),
        }
    }

    /// Pin "today" instead of reading the clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn load_reference(&mut self, data: ReferenceData) -> &ReferenceIndex {
        self.validations.clear();
        let index = self.index.insert(ReferenceIndex::build(&data));
        self.reference = Some(data);
        index
    }

    pub fn load_rows(&mut self, sheet: JobSheet) {
        info!("Session: {} rows loaded", sheet.len());
        self.validations.clear();
        self.sheet = Some(sheet);
    }

    pub fn reference(&self) -> Option<&ReferenceData> {
        self.reference.as_ref()
    }

    pub fn index(&self) -> Option<&ReferenceIndex> {
        self.index.as_ref()
    }

    pub fn sheet(&self) -> Option<&JobSheet> {
        self.sheet.as_ref()
    }

    pub fn rows(&self) -> &[JobRow] {
        self.sheet.as_ref().map(|s| s.rows.as_slice()).unwrap_or(&[])
    }

    pub fn resolver(&self) -> Option<RowResolver<'_>> {
        self.index.as_ref().map(RowResolver::new)
    }

    /// Validate every loaded row against the loaded reference data
    pub fn validate(&mut self) -> Result<&[RowValidation]> {
        let Some(index) = self.index.as_ref() else {
            bail!("No reference data loaded");
        };
        let Some(sheet) = self.sheet.as_ref() else {
            bail!("No job rows loaded");
        };

        let validator = match self.today {
            Some(today) => JobValidator::with_today(index, today),
            None => JobValidator::for_timezone(index, self.tz),
        };
        self.validations = validator.validate_rows(&sheet.rows);
        Ok(&self.validations)
    }

    pub fn validations(&self) -> &[RowValidation] {
        &self.validations
    }

    pub fn is_validated(&self) -> bool {
        !self.validations.is_empty() || self.rows().is_empty()
    }

    /// Rows of the last validation pass without ERROR issues, in input order
    pub fn ready_rows(&self) -> Vec<&JobRow> {
        self.ready_indices().map(|i| &self.rows()[i]).collect()
    }

    /// Raw records of the ready rows, for re-export with the original columns
    pub fn ready_records(&self) -> Vec<&[String]> {
        match &self.sheet {
            Some(sheet) => self
                .ready_indices()
                .filter_map(|i| sheet.records.get(i).map(Vec::as_slice))
                .collect(),
            None => Vec::new(),
        }
    }

    fn ready_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.validations
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.has_errors())
            .map(|(i, _)| i)
    }

    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.validations.iter().flat_map(|v| v.issues.iter())
    }

    pub fn summary(&self) -> ValidationSummary {
        let mut summary = ValidationSummary {
            total_rows: self.rows().len(),
            ..ValidationSummary::default()
        };

        for validation in &self.validations {
            match validation.worst_status() {
                IssueStatus::Error => summary.error_rows += 1,
                IssueStatus::Warn => summary.warn_rows += 1,
                IssueStatus::Ok => {}
            }
            if !validation.has_errors() {
                summary.ready_rows += 1;
            }
        }
        for issue in self.issues() {
            match issue.status {
                IssueStatus::Error => summary.error_issues += 1,
                IssueStatus::Warn => summary.warn_issues += 1,
                IssueStatus::Ok => {}
            }
        }
        summary
    }

    /// Drop everything except the timezone and pinned date
    pub fn reset(&mut self) {
        self.reference = None;
        self.index = None;
        self.sheet = None;
        self.validations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::parse_csv;
    use serde_json::json;

    fn reference() -> ReferenceData {
        ReferenceData {
            sites: vec![json!({"id": 1, "name": "Main Office"})],
            floors: vec![],
            spaces: vec![],
            users: vec![json!({"id": 7, "user_name": "Ann", "email": "a@x.com"})],
        }
    }

    fn sheet() -> JobSheet {
        let csv = "\
title_en,site_name,owner_email,date_start,date_end,hour_start,minute_start,hour_end,minute_end
Clean,Main Office,a@x.com,2030-01-01,2030-01-01,9,0,17,0
Broken,Nowhere,a@x.com,2030-01-01,2030-01-01,9,0,17,0
";
        parse_csv(csv.as_bytes()).unwrap()
    }

    fn session() -> ImportSession {
        ImportSession::new(chrono_tz::Europe::London)
            .with_today(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    }

    #[test]
    fn test_validate_requires_data() {
        let mut session = session();
        assert!(session.validate().is_err());
        session.load_reference(reference());
        assert!(session.validate().is_err());
    }

    #[test]
    fn test_ready_rows_and_summary() {
        let mut session = session();
        session.load_reference(reference());
        session.load_rows(sheet());
        session.validate().unwrap();

        let ready = session.ready_rows();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].title(), "Clean");
        assert_eq!(session.ready_records()[0][0], "Clean");

        let summary = session.summary();
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.ready_rows, 1);
        assert_eq!(summary.error_rows, 1);
    }

    #[test]
    fn test_loading_invalidates_validation() {
        let mut session = session();
        session.load_reference(reference());
        session.load_rows(sheet());
        session.validate().unwrap();
        assert!(!session.validations().is_empty());

        session.load_rows(sheet());
        assert!(session.validations().is_empty());

        session.reset();
        assert!(session.index().is_none());
        assert!(session.rows().is_empty());
    }
}
