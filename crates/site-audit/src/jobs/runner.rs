// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Executes jobs: one spawned task per job, progress forwarded into the
//! store, panics converted into job errors.

use super::{Job, JobMutation, JobStore};
use crate::config::AuditOptions;
use crate::error::JobError;
use crate::pipeline::AuditPipeline;
use crate::progress::{self, ProgressReceiver};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct JobRunner {
    pipeline: AuditPipeline,
    store: Arc<dyn JobStore>,
    tokens: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl JobRunner {
    pub fn new(pipeline: AuditPipeline, store: Arc<dyn JobStore>) -> Self {
        Self {
            pipeline,
            store,
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a job for `url` and start it in the background.
    pub async fn submit(&self, url: &str, options: AuditOptions) -> Job {
        let job = self.store.create(url).await;
        let token = CancellationToken::new();
        self.lock_tokens().insert(job.id, token.clone());

        let runner = self.clone();
        let id = job.id;
        let url = url.to_string();
        tokio::spawn(async move {
            runner.execute(id, url, options, token).await;
            runner.lock_tokens().remove(&id);
        });

        info!("job {} queued for {}", job.id, job.url);
        job
    }

    /// Request cancellation; honored at the next stage boundary or page
    /// operation.
    pub async fn cancel(&self, id: Uuid) -> Result<(), JobError> {
        let token = self.lock_tokens().get(&id).cloned();
        if let Some(token) = token {
            token.cancel();
            return Ok(());
        }
        match self.store.get(id).await {
            Some(job) if job.status.is_terminal() => Err(JobError::AlreadyTerminal(id)),
            Some(_) => Ok(()),
            None => Err(JobError::NotFound(id)),
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.store.get(id).await
    }

    fn lock_tokens(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, CancellationToken>> {
        self.tokens.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn execute(&self, id: Uuid, url: String, options: AuditOptions, token: CancellationToken) {
        if let Err(e) = self.store.update(id, JobMutation::Start).await {
            warn!("job {id} could not start: {e}");
            return;
        }

        let (tx, rx) = progress::channel();
        let forwarder = tokio::spawn(forward_progress(Arc::clone(&self.store), id, rx));

        let job_id = id.to_string();
        let outcome = AssertUnwindSafe(self.pipeline.run(&url, &options, Some(tx), &job_id, &token))
            .catch_unwind()
            .await;

        // The sender is dropped with the pipeline future; drain the rest.
        if let Err(e) = forwarder.await {
            warn!("progress forwarder for job {id} failed: {e}");
        }

        let mutation = match outcome {
            Ok(Ok(result)) => {
                info!("job {id} done: score {}", result.score.total);
                JobMutation::Complete(Box::new(result))
            }
            Ok(Err(e)) => {
                warn!("job {id} failed: {e}");
                JobMutation::Fail(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(&panic);
                error!("job {id} panicked: {message}");
                JobMutation::Fail(format!("Interner Fehler: {message}"))
            }
        };

        if let Err(e) = self.store.update(id, mutation).await {
            warn!("job {id} could not be finalized: {e}");
        }
    }
}

async fn forward_progress(store: Arc<dyn JobStore>, id: Uuid, mut rx: ProgressReceiver) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let message = event.event.describe();
                let mutation = match event.event.percent() {
                    Some(percent) => JobMutation::Progress(percent, message),
                    None => JobMutation::Log(message),
                };
                if store.update(id, mutation).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("job {id}: {skipped} progress events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let caught = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(&caught), "boom");
        let caught = std::panic::catch_unwind(|| panic!("{}", String::from("owned"))).unwrap_err();
        assert_eq!(panic_message(&caught), "owned");
    }
}
