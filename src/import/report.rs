//! Files written for each validation or import run
//!
//! A run directory is named after the local start time (`YYYYMMDD_HHMMSS`)
//! under the configured runs directory.

use anyhow::{Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use csv::Writer;
use log::info;
use serde::Serialize;
use serde_json::{Value, json};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use super::runner::ImportOutcome;
use crate::jobs::RowValidation;
use crate::reference::ReferenceData;
use crate::session::ImportSession;

pub const AUDIT_REPORT: &str = "audit_report.csv";
pub const VALIDATED_READY: &str = "validated_ready.csv";
pub const LOOKUP_CACHE: &str = "lookup_cache.json";
pub const RUN_SUMMARY: &str = "run_summary.json";
pub const CREATED_IDS: &str = "created_ids.csv";
pub const FAILURES: &str = "failures.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub domain: String,
    pub total_rows: usize,
    pub ready_rows: usize,
    pub error_rows: usize,
    pub timezone: String,
}

#[derive(Debug, Clone)]
pub struct RunDirectory {
    path: PathBuf,
    timestamp: String,
}

impl RunDirectory {
    pub fn create(runs_dir: &Path, started: DateTime<Tz>) -> Result<Self> {
        let timestamp = started.format("%Y%m%d_%H%M%S").to_string();
        let path = runs_dir.join(&timestamp);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create run directory {}", path.display()))?;
        info!("Run directory: {}", path.display());
        Ok(Self { path, timestamp })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// One line per issue, in row order
    pub fn write_audit_report(&self, validations: &[RowValidation]) -> Result<PathBuf> {
        let path = self.file(AUDIT_REPORT);
        let mut writer = Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for issue in validations.iter().flat_map(|v| v.issues.iter()) {
            writer.serialize(issue)?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// Ready rows with the columns exactly as they were read
    pub fn write_ready_rows(&self, headers: &[String], records: &[&[String]]) -> Result<PathBuf> {
        let path = self.file(VALIDATED_READY);
        let mut writer = Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(headers)?;
        for record in records {
            writer.write_record(*record)?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// Location lists in full; users only as a count
    pub fn write_lookup_cache(&self, reference: &ReferenceData) -> Result<PathBuf> {
        let cache = json!({
            "sites": reference.sites,
            "floors": reference.floors,
            "spaces": reference.spaces,
            "users_count": reference.users.len(),
        });
        self.write_json(LOOKUP_CACHE, &cache)
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        let value = serde_json::to_value(summary)?;
        self.write_json(RUN_SUMMARY, &value)
    }

    /// created_ids.csv and failures.csv; each only when it has rows
    pub fn write_import_results(&self, outcome: &ImportOutcome) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        if !outcome.created.is_empty() {
            written.push(self.write_rows(CREATED_IDS, &outcome.created)?);
        }
        if !outcome.failures.is_empty() {
            written.push(self.write_rows(FAILURES, &outcome.failures)?);
        }
        Ok(written)
    }

    /// Everything a validation pass exports
    pub fn export_validation(&self, session: &ImportSession, domain: &str) -> Result<RunSummary> {
        self.write_audit_report(session.validations())?;

        let headers = session.sheet().map(|s| s.headers.as_slice()).unwrap_or(&[]);
        self.write_ready_rows(headers, &session.ready_records())?;

        if let Some(reference) = session.reference() {
            self.write_lookup_cache(reference)?;
        }

        let counts = session.summary();
        let summary = RunSummary {
            timestamp: self.timestamp.clone(),
            domain: domain.to_string(),
            total_rows: counts.total_rows,
            ready_rows: counts.ready_rows,
            error_rows: counts.error_rows,
            timezone: session.timezone().name().to_string(),
        };
        self.write_summary(&summary)?;
        Ok(summary)
    }

    fn write_rows<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<PathBuf> {
        let path = self.file(name);
        let mut writer = Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(path)
    }

    fn write_json(&self, name: &str, value: &Value) -> Result<PathBuf> {
        let path = self.file(name);
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, value)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
