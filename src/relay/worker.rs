//! Background worker executing submitted jobs.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::executor::{Executor, Transport};
use crate::relay::message::{JobOutcome, JobSubmission};

/// Channel ends and task handle of a running worker.
pub struct RelayChannels {
    pub submissions: mpsc::UnboundedSender<JobSubmission>,
    pub outcomes: mpsc::UnboundedReceiver<JobOutcome>,
    pub handle: JoinHandle<()>,
}

/// Receives submissions and runs each job in its own task.
///
/// Jobs run concurrently; outcomes are sent in completion order, each
/// tagged with its job id. A started job is never cancelled, not even by
/// shutdown: it finishes and its outcome is still delivered.
pub struct RelayWorker<T> {
    executor: Arc<Executor<T>>,
    outcomes: mpsc::UnboundedSender<JobOutcome>,
}

impl<T: Transport + 'static> RelayWorker<T> {
    pub fn spawn(executor: Arc<Executor<T>>, shutdown: broadcast::Receiver<()>) -> RelayChannels {
        let (submission_tx, submission_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let worker = Self {
            executor,
            outcomes: outcome_tx,
        };
        let handle = tokio::spawn(worker.run(submission_rx, shutdown));

        RelayChannels {
            submissions: submission_tx,
            outcomes: outcome_rx,
            handle,
        }
    }

    async fn run(
        self,
        mut submissions: mpsc::UnboundedReceiver<JobSubmission>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!("Relay worker started");

        loop {
            tokio::select! {
                next = submissions.recv() => match next {
                    Some(submission) => self.dispatch(submission),
                    None => {
                        tracing::info!("All submitters gone, relay worker exiting");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Relay worker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn dispatch(&self, submission: JobSubmission) {
        let executor = self.executor.clone();
        let outcomes = self.outcomes.clone();

        tokio::spawn(async move {
            let (id, job) = submission.into_parts();
            tracing::debug!(job_id = %id, "Job received");

            let outcome = JobOutcome::from_result(id, executor.execute(&job).await);
            if let Err(e) = outcomes.send(outcome) {
                tracing::warn!(job_id = %e.0.id, "Outcome receiver gone, dropping outcome");
            }
        });
    }
}
