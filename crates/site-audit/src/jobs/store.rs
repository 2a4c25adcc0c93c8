// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

use super::{Job, JobMutation};
use crate::error::JobError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Create/get/update access to job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a queued job for `url`.
    async fn create(&self, url: &str) -> Job;

    async fn get(&self, id: Uuid) -> Option<Job>;

    /// Apply `mutation` to the job and return its new state.
    async fn update(&self, id: Uuid, mutation: JobMutation) -> Result<Job, JobError>;

    /// All jobs, oldest first.
    async fn list(&self) -> Vec<Job>;
}

/// Process-local job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, url: &str) -> Job {
        let job = Job::new(url);
        self.jobs.write().await.insert(job.id, job.clone());
        job
    }

    async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    async fn update(&self, id: Uuid, mutation: JobMutation) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        job.apply(mutation)?;
        Ok(job.clone())
    }

    async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;

    #[tokio::test]
    async fn test_create_get_update() {
        let store = InMemoryJobStore::new();
        let job = store.create("https://example.com/").await;
        assert_eq!(job.status, JobStatus::Queued);

        let updated = store.update(job.id, JobMutation::Start).await.unwrap();
        assert_eq!(updated.status, JobStatus::Running);
        assert_eq!(store.get(job.id).await.unwrap().status, JobStatus::Running);
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = InMemoryJobStore::new();
        let id = Uuid::new_v4();
        assert!(store.get(id).await.is_none());
        let err = store.update(id, JobMutation::Start).await.unwrap_err();
        assert!(matches!(err, JobError::NotFound(_)));
    }
}
