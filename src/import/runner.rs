//! Sequential import with a failure-rate circuit breaker
//!
//! Rows are submitted one at a time in input order. Before each row the
//! runner checks for cancellation and for a failure rate above the
//! threshold; either stops the batch and the remaining rows are skipped.

use log::{error, info, warn};
use serde::Serialize;
use std::fmt;

use super::{CancellationFlag, JobSubmitter};
use crate::jobs::{JobRow, RowResolver, build_row_payload};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedRow {
    pub csv_row: usize,
    pub status: &'static str,
    pub job_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRow {
    pub csv_row: usize,
    pub status: &'static str,
    pub error: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbortReason {
    FailureRate { rate: f64, threshold: f64 },
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::FailureRate { rate, threshold } => write!(
                f,
                "failure rate {:.1}% exceeds {:.1}%",
                rate * 100.0,
                threshold * 100.0
            ),
            AbortReason::Cancelled => f.write_str("cancelled by user"),
        }
    }
}

/// What happened to one row, reported as the run progresses
#[derive(Debug, Clone, Copy)]
pub enum RowEvent<'a> {
    Created { index: usize, total: usize, row: &'a CreatedRow },
    Failed { index: usize, total: usize, row: &'a FailedRow },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub created: Vec<CreatedRow>,
    pub failures: Vec<FailedRow>,
    /// Submissions that reached the API
    pub attempts: usize,
    /// Rows never looked at because the run stopped early
    pub skipped: usize,
    pub aborted: Option<AbortReason>,
}

impl ImportOutcome {
    pub fn failure_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.submit_failures() as f64 / self.attempts as f64
        }
    }

    /// Failures returned by the API, excluding rows refused before sending
    pub fn submit_failures(&self) -> usize {
        self.attempts - self.created.len()
    }
}

pub struct ImportRunner<'a, S: JobSubmitter + ?Sized> {
    submitter: &'a S,
    resolver: RowResolver<'a>,
    failure_threshold: f64,
    cancel: CancellationFlag,
}

impl<'a, S: JobSubmitter + ?Sized> ImportRunner<'a, S> {
    pub fn new(submitter: &'a S, resolver: RowResolver<'a>, failure_threshold: f64) -> Self {
        Self {
            submitter,
            resolver,
            failure_threshold,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, rows: &[&JobRow]) -> ImportOutcome {
        self.run_with(rows, |_| {}).await
    }

    pub async fn run_with<F>(&self, rows: &[&JobRow], mut on_row: F) -> ImportOutcome
    where
        F: FnMut(RowEvent<'_>),
    {
        let total = rows.len();
        let mut outcome = ImportOutcome::default();

        for (index, row) in rows.iter().enumerate() {
            if let Some(reason) = self.should_stop(&outcome) {
                warn!("Import stopped before row {}: {}", row.row_number, reason);
                outcome.aborted = Some(reason);
                outcome.skipped = total - index;
                break;
            }

            let payload = match build_row_payload(row, &self.resolver) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Row {} refused before submission: {}", row.row_number, e);
                    let failed = failed_row(row, format!("Validation failed: {}", e));
                    on_row(RowEvent::Failed { index, total, row: &failed });
                    outcome.failures.push(failed);
                    continue;
                }
            };

            info!("Submitting row {} ({}/{}): {}", row.row_number, index + 1, total, row.title());
            outcome.attempts += 1;

            match self.submitter.submit(row.row_number, &payload).await {
                Ok(created) => {
                    let created = CreatedRow {
                        csv_row: row.row_number,
                        status: "success",
                        job_id: created.id,
                        title: row.title().to_string(),
                    };
                    on_row(RowEvent::Created { index, total, row: &created });
                    outcome.created.push(created);
                }
                Err(e) => {
                    error!("Row {} failed: {}", row.row_number, e);
                    let failed = failed_row(row, e.to_json().to_string());
                    on_row(RowEvent::Failed { index, total, row: &failed });
                    outcome.failures.push(failed);
                }
            }
        }

        info!(
            "Import finished: {} created, {} failed, {} skipped",
            outcome.created.len(),
            outcome.failures.len(),
            outcome.skipped
        );
        outcome
    }

    fn should_stop(&self, outcome: &ImportOutcome) -> Option<AbortReason> {
        if self.cancel.is_cancelled() {
            return Some(AbortReason::Cancelled);
        }
        if outcome.attempts > 0 {
            let rate = outcome.failure_rate();
            if rate > self.failure_threshold {
                return Some(AbortReason::FailureRate {
                    rate,
                    threshold: self.failure_threshold,
                });
            }
        }
        None
    }
}

fn failed_row(row: &JobRow, error: String) -> FailedRow {
    FailedRow {
        csv_row: row.row_number,
        status: "failed",
        error,
        title: row.title().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CreatedJob, SubmitError};
    use crate::jobs::{JobPayload, parse_csv};
    use crate::reference::{ReferenceData, ReferenceIndex};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Fails the listed rows with a 422, accepts the rest
    struct ScriptedSubmitter {
        fail_rows: Vec<usize>,
        seen: Mutex<Vec<usize>>,
    }

    impl ScriptedSubmitter {
        fn failing(fail_rows: &[usize]) -> Self {
            Self {
                fail_rows: fail_rows.to_vec(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl JobSubmitter for ScriptedSubmitter {
        async fn submit(&self, row_number: usize, _payload: &JobPayload) -> Result<CreatedJob, SubmitError> {
            self.seen.lock().unwrap().push(row_number);
            if self.fail_rows.contains(&row_number) {
                Err(SubmitError::http(422, "rejected"))
            } else {
                Ok(CreatedJob { id: format!("job-{}", row_number) })
            }
        }
    }

    fn index() -> ReferenceIndex {
        ReferenceIndex::build(&ReferenceData {
            sites: vec![json!({"id": 1, "name": "HQ"})],
            floors: vec![],
            spaces: vec![],
            users: vec![json!({"id": 7, "user_name": "ann", "email": "a@x.com"})],
        })
    }

    fn rows(count: usize) -> Vec<JobRow> {
        let mut csv = String::from(
            "title_en,site_name,owner_email,date_start,date_end,hour_start,minute_start,hour_end,minute_end\n",
        );
        for i in 0..count {
            csv.push_str(&format!("Job {},HQ,a@x.com,2030-01-01,2030-01-01,9,{},17,0\n", i, i % 60));
        }
        parse_csv(csv.as_bytes()).unwrap().rows
    }

    #[tokio::test]
    async fn test_all_rows_created() {
        let index = index();
        let rows = rows(3);
        let refs: Vec<&JobRow> = rows.iter().collect();
        let submitter = ScriptedSubmitter::failing(&[]);

        let outcome = ImportRunner::new(&submitter, RowResolver::new(&index), 0.1).run(&refs).await;

        assert_eq!(outcome.created.len(), 3);
        assert_eq!(outcome.created[0].job_id, "job-2");
        assert_eq!(outcome.created[0].status, "success");
        assert!(outcome.aborted.is_none());
        assert_eq!(*submitter.seen.lock().unwrap(), vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_breaker_trips_on_failure_rate() {
        let index = index();
        let rows = rows(20);
        let refs: Vec<&JobRow> = rows.iter().collect();
        // rows 2..=11 succeed, row 12 fails: 1/11 is under 10%, 2/12 is not
        let submitter = ScriptedSubmitter::failing(&[12, 13]);

        let outcome = ImportRunner::new(&submitter, RowResolver::new(&index), 0.1).run(&refs).await;

        assert_eq!(outcome.attempts, 12);
        assert_eq!(outcome.created.len(), 10);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.skipped, 8);
        assert!(matches!(outcome.aborted, Some(AbortReason::FailureRate { .. })));
    }

    #[tokio::test]
    async fn test_first_failure_stops_batch() {
        let index = index();
        let rows = rows(5);
        let refs: Vec<&JobRow> = rows.iter().collect();
        let submitter = ScriptedSubmitter::failing(&[2]);

        let outcome = ImportRunner::new(&submitter, RowResolver::new(&index), 0.1).run(&refs).await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.skipped, 4);
        assert!(outcome.failures[0].error.contains("422"));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_row() {
        let index = index();
        let rows = rows(2);
        let refs: Vec<&JobRow> = rows.iter().collect();
        let submitter = ScriptedSubmitter::failing(&[]);
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let outcome = ImportRunner::new(&submitter, RowResolver::new(&index), 0.1)
            .with_cancellation(cancel)
            .run(&refs)
            .await;

        assert_eq!(outcome.aborted, Some(AbortReason::Cancelled));
        assert_eq!(outcome.skipped, 2);
        assert!(submitter.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unbuildable_payload_not_sent() {
        let index = index();
        let mut rows = rows(2);
        rows[0].site_name = Some("Unknown".into());
        let refs: Vec<&JobRow> = rows.iter().collect();
        let submitter = ScriptedSubmitter::failing(&[]);

        let mut events = 0;
        let outcome = ImportRunner::new(&submitter, RowResolver::new(&index), 0.1)
            .run_with(&refs, |_| events += 1)
            .await;

        assert_eq!(events, 2);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.created.len(), 1);
        assert!(outcome.failures[0].error.starts_with("Validation failed"));
        assert_eq!(*submitter.seen.lock().unwrap(), vec![3]);
    }
}
