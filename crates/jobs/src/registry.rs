//! In-memory job store.
//!
//! One `RwLock` guards the whole map, and every read hands back a cloned
//! [`JobSnapshot`], so pollers never observe a job mid-update: status,
//! progress, report and error always come from the same write.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::report::AnalysisReport;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash,
)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString,
    PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    /// Whether the job will make no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct JobProgress {
    /// Sheets fully processed so far.
    pub current_sheet: usize,
    pub total_sheets: usize,
}

/// A consistent point-in-time view of one job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: JobProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobSnapshot>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in the queued state and return its id.
    pub fn create(&self) -> JobId {
        let id = JobId::new();
        let snapshot = JobSnapshot {
            id,
            status: JobStatus::Queued,
            progress: JobProgress::default(),
            report: None,
            error: None,
        };
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, snapshot);
        id
    }

    /// Transition to running once the sheet count is known.
    pub fn mark_running(&self, id: JobId, total_sheets: usize) {
        self.update(id, |job| {
            job.status = JobStatus::Running;
            job.progress = JobProgress {
                current_sheet: 0,
                total_sheets,
            };
        });
    }

    pub fn set_progress(&self, id: JobId, current_sheet: usize) {
        self.update(id, |job| {
            job.progress.current_sheet = current_sheet;
        });
    }

    pub fn complete(&self, id: JobId, report: AnalysisReport) {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.progress.current_sheet = job.progress.total_sheets;
            job.report = Some(report);
            job.error = None;
        });
    }

    pub fn fail(&self, id: JobId, message: String) {
        self.update(id, |job| {
            job.status = JobStatus::Error;
            job.report = None;
            job.error = Some(message);
        });
    }

    /// Clone the job's current state, if it exists.
    pub fn get(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn remove(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn len(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(&self, id: JobId, f: impl FnOnce(&mut JobSnapshot)) {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(job) = jobs.get_mut(&id) {
            f(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        let registry = JobRegistry::new();
        let id = registry.create();

        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress.total_sheets, 0);

        registry.mark_running(id, 3);
        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress.total_sheets, 3);

        registry.set_progress(id, 2);
        assert_eq!(registry.get(id).unwrap().progress.current_sheet, 2);

        registry.complete(id, AnalysisReport::default());
        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress.current_sheet, 3);
        assert!(job.report.is_some());
        assert!(job.status.is_terminal());
    }

    #[test]
    fn failure_clears_report() {
        let registry = JobRegistry::new();
        let id = registry.create();
        registry.mark_running(id, 1);
        registry.fail(id, "render failed".to_string());

        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("render failed"));
        assert!(job.report.is_none());
    }

    #[test]
    fn unknown_id_is_none() {
        let registry = JobRegistry::new();
        assert!(registry.get(JobId::new()).is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }

    #[test]
    fn remove_drops_the_record() {
        let registry = JobRegistry::new();
        let id = registry.create();
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
        assert!(registry.get(id).is_none());
    }
}
