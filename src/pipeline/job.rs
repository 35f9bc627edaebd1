use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

use crate::ai::ClinicalFields;

/// Everything a worker needs to process one uploaded recording. Built when
/// the upload is accepted and dropped when the worker finishes.
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub job_id: Uuid,
    pub record_id: i64,
    pub patient_id: i64,
    pub audio: Vec<u8>,
    pub mime_type: String,
    pub api_key: String,
    pub system_prompt: String,
    pub model: String,
    pub prior_fields: ClinicalFields,
    /// Session date, used for the dated append markers
    pub session_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable state of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub job_id: Uuid,
    pub record_id: i64,
    pub status: JobStatus,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory registry of job states, shared between the HTTP layer and the
/// workers. Entries live for the process lifetime; a single practice
/// produces a handful per day.
#[derive(Default)]
pub struct JobTracker {
    jobs: Mutex<HashMap<Uuid, JobInfo>>,
}

impl JobTracker {
    pub fn insert_queued(&self, job_id: Uuid, record_id: i64) {
        self.set(job_id, record_id, JobStatus::Queued, None);
    }

    pub fn set_running(&self, job_id: Uuid, record_id: i64) {
        self.set(job_id, record_id, JobStatus::Running, None);
    }

    pub fn set_succeeded(&self, job_id: Uuid, record_id: i64) {
        self.set(job_id, record_id, JobStatus::Succeeded, None);
    }

    pub fn set_failed(&self, job_id: Uuid, record_id: i64, error: String) {
        self.set(job_id, record_id, JobStatus::Failed, Some(error));
    }

    pub fn remove(&self, job_id: &Uuid) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.remove(job_id);
        }
    }

    pub fn get(&self, job_id: &Uuid) -> Option<JobInfo> {
        self.jobs.lock().ok()?.get(job_id).cloned()
    }

    fn set(&self, job_id: Uuid, record_id: i64, status: JobStatus, error: Option<String>) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(
                job_id,
                JobInfo {
                    job_id,
                    record_id,
                    status,
                    error,
                    updated_at: Utc::now(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_transitions() {
        let tracker = JobTracker::default();
        let id = Uuid::new_v4();

        tracker.insert_queued(id, 7);
        assert_eq!(tracker.get(&id).unwrap().status, JobStatus::Queued);

        tracker.set_running(id, 7);
        assert_eq!(tracker.get(&id).unwrap().status, JobStatus::Running);

        tracker.set_failed(id, 7, "boom".to_string());
        let info = tracker.get(&id).unwrap();
        assert_eq!(info.status, JobStatus::Failed);
        assert_eq!(info.error.as_deref(), Some("boom"));
        assert_eq!(info.record_id, 7);
    }

    #[test]
    fn test_unknown_job_is_none() {
        let tracker = JobTracker::default();
        assert!(tracker.get(&Uuid::new_v4()).is_none());
    }
}
