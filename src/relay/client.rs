//! Submitter side of the relay.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::executor::{Executor, Transport};
use crate::relay::message::{JobId, JobOutcome, JobSubmission};
use crate::relay::worker::RelayWorker;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The job ran and failed; carries the executor's message.
    #[error("{0}")]
    Job(String),

    /// The worker stopped before delivering an outcome.
    #[error("relay worker is not running")]
    Closed,

    #[error("job id '{0}' is already pending")]
    DuplicateId(JobId),
}

type PendingJobs = Arc<DashMap<JobId, oneshot::Sender<JobOutcome>>>;

/// Submits jobs and matches outcomes back to their callers by job id.
#[derive(Clone)]
pub struct RelayClient {
    submissions: mpsc::UnboundedSender<JobSubmission>,
    pending: PendingJobs,
}

impl RelayClient {
    /// Wrap an existing pair of channels and start the outcome dispatcher.
    pub fn new(
        submissions: mpsc::UnboundedSender<JobSubmission>,
        outcomes: mpsc::UnboundedReceiver<JobOutcome>,
    ) -> Self {
        let pending: PendingJobs = Arc::new(DashMap::new());
        tokio::spawn(dispatch_outcomes(outcomes, pending.clone()));

        Self {
            submissions,
            pending,
        }
    }

    /// Start a worker over `executor` and connect to it.
    pub fn connect<T: Transport + 'static>(
        executor: Arc<Executor<T>>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let channels = RelayWorker::spawn(executor, shutdown);
        Self::new(channels.submissions, channels.outcomes)
    }

    /// Run a job under a fresh id and wait for its result.
    pub async fn submit(
        &self,
        endpoint: impl Into<String>,
        payload: Value,
        credential: impl Into<String>,
    ) -> Result<Value, RelayError> {
        let submission = JobSubmission::new(JobId::generate(), endpoint, payload, credential);
        self.submit_with_id(submission)
            .await?
            .into_result()
            .map_err(RelayError::Job)
    }

    /// Submit a job under its own id and wait for the outcome.
    pub async fn submit_with_id(&self, submission: JobSubmission) -> Result<JobOutcome, RelayError> {
        let id = submission.id.clone();
        let (tx, rx) = oneshot::channel();

        match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => return Err(RelayError::DuplicateId(id)),
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }

        if self.submissions.send(submission).is_err() {
            self.pending.remove(&id);
            return Err(RelayError::Closed);
        }

        rx.await.map_err(|_| RelayError::Closed)
    }

    /// Jobs submitted whose outcome has not arrived yet.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

async fn dispatch_outcomes(mut outcomes: mpsc::UnboundedReceiver<JobOutcome>, pending: PendingJobs) {
    while let Some(outcome) = outcomes.recv().await {
        match pending.remove(&outcome.id) {
            Some((_, waiter)) => {
                if waiter.send(outcome).is_err() {
                    tracing::debug!("Submitter stopped waiting, outcome discarded");
                }
            }
            None => {
                tracing::warn!(job_id = %outcome.id, "Outcome for unknown job dropped");
            }
        }
    }

    // Dropping the senders wakes every remaining waiter with `Closed`.
    pending.clear();
}
