//! Report data model for one matrix run.
//!
//! Entries are appended by the runner after each case completes, one per case
//! identity. Once [`ReportModel::finish`] is called the model is read-only.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::case::{Modality, Platform, TestCase};
use crate::core::retry::AttemptResult;
use crate::errors::{TesterError, TesterResult};

/// One recorded case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub identity: String,
    pub case: TestCase,
    pub result: AttemptResult,
    /// Failure was anticipated from the model's capabilities
    pub expected_failure: bool,
}

impl ReportEntry {
    pub fn passed(&self) -> bool {
        self.result.outcome.success
    }
}

/// Pass/fail counts for a group of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub passed: usize,
}

impl Tally {
    fn add(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        }
    }
}

/// Aggregate counts derived from the entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub expected_failures: usize,
    /// Percentage of passed cases, 0.0 for an empty run
    pub success_rate: f64,
    pub by_modality: BTreeMap<Modality, Tally>,
    pub by_platform: BTreeMap<Platform, Tally>,
}

/// Results of one run keyed by case identity, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct ReportModel {
    pub run_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    entries: Vec<ReportEntry>,
}

impl Default for ReportModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportModel {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: OffsetDateTime::now_utc(),
            finished_at: None,
            entries: Vec::new(),
        }
    }

    /// Append the result of a case.
    ///
    /// # Errors
    /// `Internal` if the identity was already recorded or the run is finished.
    pub fn record(&mut self, case: TestCase, result: AttemptResult) -> TesterResult<()> {
        if self.finished_at.is_some() {
            return Err(TesterError::Internal(
                "Report is finished and read-only".to_string(),
            ));
        }
        let identity = case.identity();
        if self.get(&identity).is_some() {
            return Err(TesterError::Internal(format!(
                "Duplicate report entry for {identity}"
            )));
        }
        let expected_failure = case.is_expected_failure() && !result.outcome.success;
        self.entries.push(ReportEntry {
            identity,
            case,
            result,
            expected_failure,
        });
        Ok(())
    }

    /// Mark the run complete.
    pub fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(OffsetDateTime::now_utc());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn get(&self, identity: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.identity == identity)
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let mut by_modality: BTreeMap<Modality, Tally> = BTreeMap::new();
        let mut by_platform: BTreeMap<Platform, Tally> = BTreeMap::new();
        let mut passed = 0;
        let mut expected_failures = 0;

        for entry in &self.entries {
            let ok = entry.passed();
            if ok {
                passed += 1;
            }
            if entry.expected_failure {
                expected_failures += 1;
            }
            by_modality.entry(entry.case.modality).or_default().add(ok);
            by_platform.entry(entry.case.platform).or_default().add(ok);
        }

        let total = self.entries.len();
        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 * 100.0 / total as f64
        };

        ReportSummary {
            total,
            passed,
            failed: total - passed,
            expected_failures,
            success_rate,
            by_modality,
            by_platform,
        }
    }

    /// Serialize the report and its summary as pretty JSON.
    pub fn to_json(&self) -> TesterResult<String> {
        #[derive(Serialize)]
        struct Document<'a> {
            #[serde(flatten)]
            report: &'a ReportModel,
            summary: ReportSummary,
        }

        serde_json::to_string_pretty(&Document {
            report: self,
            summary: self.summary(),
        })
        .map_err(|e| TesterError::Internal(format!("Failed to serialize report: {e}")))
    }

    /// Write the JSON report to `path`.
    pub fn write_json(&self, path: &Path) -> TesterResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| {
            TesterError::Internal(format!("Failed to write report {}: {e}", path.display()))
        })?;
        tracing::info!("Report written to {}", path.display());
        Ok(())
    }
}
