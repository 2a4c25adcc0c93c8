// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Audit jobs: records, the store interface and the runner that executes
//! one pipeline run per job in its own task.

mod runner;
mod store;

pub use runner::JobRunner;
pub use store::{InMemoryJobStore, JobStore};

use crate::error::JobError;
use crate::pipeline::AuditResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an audit job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// One audit job.
///
/// `result` is present iff the job is done, `error` iff it failed. Progress
/// never decreases and a terminal job is never modified again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub url: String,
    pub status: JobStatus,
    /// Percentage in [0, 100].
    pub progress: u8,
    pub result: Option<Box<AuditResult>>,
    pub error: Option<String>,
    pub logs: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A change to a job, applied by its owning run.
#[derive(Debug, Clone)]
pub enum JobMutation {
    Start,
    /// Raise progress to the given percentage and log the message.
    Progress(u8, String),
    Log(String),
    Complete(Box<AuditResult>),
    Fail(String),
}

impl Job {
    pub fn new(url: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            status: JobStatus::Queued,
            progress: 0,
            result: None,
            error: None,
            logs: Vec::new(),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    fn log(&mut self, message: String) {
        self.logs.push(LogEntry {
            at: Utc::now(),
            message,
        });
    }

    /// Apply `mutation`, enforcing the job invariants.
    pub fn apply(&mut self, mutation: JobMutation) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(JobError::AlreadyTerminal(self.id));
        }
        match mutation {
            JobMutation::Start => {
                self.status = JobStatus::Running;
                self.log("Audit gestartet".to_string());
            }
            JobMutation::Progress(percent, message) => {
                self.progress = self.progress.max(percent.min(100));
                self.log(message);
            }
            JobMutation::Log(message) => self.log(message),
            JobMutation::Complete(result) => {
                self.status = JobStatus::Done;
                self.progress = 100;
                self.result = Some(result);
                self.finished_at = Some(Utc::now());
                self.log("Audit abgeschlossen".to_string());
            }
            JobMutation::Fail(error) => {
                self.status = JobStatus::Error;
                self.log(format!("Fehler: {error}"));
                self.error = Some(error);
                self.finished_at = Some(Utc::now());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic_and_bounded() {
        let mut job = Job::new("https://example.com/");
        job.apply(JobMutation::Start).unwrap();
        job.apply(JobMutation::Progress(25, "a".to_string())).unwrap();
        job.apply(JobMutation::Progress(10, "b".to_string())).unwrap();
        assert_eq!(job.progress, 25);
        job.apply(JobMutation::Progress(250, "c".to_string())).unwrap();
        assert_eq!(job.progress, 100);
        assert_eq!(job.logs.len(), 4);
    }

    #[test]
    fn test_terminal_job_is_immutable() {
        let mut job = Job::new("https://example.com/");
        job.apply(JobMutation::Start).unwrap();
        job.apply(JobMutation::Fail("Audit abgebrochen".to_string()))
            .unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("Audit abgebrochen"));
        assert!(job.result.is_none());

        let err = job.apply(JobMutation::Log("late".to_string())).unwrap_err();
        assert!(matches!(err, JobError::AlreadyTerminal(id) if id == job.id));
        assert!(job.apply(JobMutation::Start).is_err());
        assert_eq!(job.status, JobStatus::Error);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JobStatus::Queued).unwrap(), "\"queued\"");
        assert!(JobStatus::Done.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
