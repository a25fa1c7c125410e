//! Batch submission of validated rows and the files a run leaves behind

pub mod report;
pub mod runner;

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::{CreatedJob, SubmitError};
use crate::jobs::JobPayload;

pub use report::{RunDirectory, RunSummary};
pub use runner::{AbortReason, CreatedRow, FailedRow, ImportOutcome, ImportRunner, RowEvent};

/// Anything that can turn a payload into a created job
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, row_number: usize, payload: &JobPayload) -> Result<CreatedJob, SubmitError>;
}

/// Stop request shared between the signal handler and the runner.
/// Checked before each row; a row in flight always completes.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
