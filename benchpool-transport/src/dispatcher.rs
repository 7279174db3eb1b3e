//! Submission intake and result aggregation

use crate::error::DispatchError;
use benchpool_common::{messages, FinishedJobMessage, Fingerprint, NewJobMessage, Submission, Topic};
use benchpool_core::{publish_message, run_consumer, BusError, JobBus, SubmissionStore};
use benchpool_sandbox::{FormatError, Formatter};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Aggregated text of every result already recorded
    Cached(String),
    /// A job was published; results arrive later
    Submitted(Fingerprint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { total: usize },
    UnknownSubmission,
}

pub struct Dispatcher {
    store: Arc<dyn SubmissionStore>,
    bus: Arc<dyn JobBus>,
    formatter: Arc<dyn Formatter>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        bus: Arc<dyn JobBus>,
        formatter: Arc<dyn Formatter>,
    ) -> Self {
        Self {
            store,
            bus,
            formatter,
        }
    }

    /// Normalize and fingerprint `raw_code`, answering from the cache when
    /// results exist and publishing a job otherwise.
    pub async fn submit(&self, raw_code: &str) -> Result<SubmitOutcome, DispatchError> {
        let code = self.formatter.normalize(raw_code).await?;
        let hash = Fingerprint::of(&code);

        match self.store.get(&hash).await? {
            Some(existing) if existing.has_results() => {
                debug!(hash = %hash, results = existing.results.len(), "Cache hit");
                return Ok(SubmitOutcome::Cached(existing.aggregated_text()));
            }
            Some(_) => {
                debug!(hash = %hash, "Known submission without results, republishing");
            }
            None => {
                let submission = Submission::new(code.clone());
                if !self.store.create(&submission).await? {
                    debug!(hash = %hash, "Submission created concurrently");
                }
            }
        }

        let job = NewJobMessage {
            hash: hash.clone(),
            code,
        };
        publish_message(self.bus.as_ref(), Topic::NewJobs, &job).await?;
        info!(hash = %hash, "Job published");
        Ok(SubmitOutcome::Submitted(hash))
    }

    /// Format for display, organizing imports as well.
    pub async fn format(&self, raw_code: &str) -> Result<String, FormatError> {
        self.formatter.format(raw_code, true).await
    }

    /// Append a finished result to its submission.
    pub async fn merge_finished(
        &self,
        message: FinishedJobMessage,
    ) -> Result<MergeOutcome, DispatchError> {
        let hash = message.fingerprint().clone();
        let Some(mut submission) = self.store.get(&hash).await? else {
            warn!(hash = %hash, "Finished job for a submission that is not in the store");
            return Ok(MergeOutcome::UnknownSubmission);
        };

        submission.push_result(message.into_result());
        self.store.put(&submission).await?;
        let total = submission.results.len();
        info!(hash = %hash, total, "Result merged");
        Ok(MergeOutcome::Merged { total })
    }

    async fn handle_finished(&self, payload: &str) {
        let message: FinishedJobMessage = match messages::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                error!("{}", DispatchError::Decode(e));
                return;
            }
        };
        if let Err(e) = self.merge_finished(message).await {
            error!("Failed to merge result: {}", e);
        }
    }

    /// Subscribe to finished jobs and merge them in the background.
    ///
    /// The subscription is confirmed before this returns. Merges run one
    /// at a time on the returned task.
    pub async fn spawn_merge_loop(self: &Arc<Self>) -> Result<JoinHandle<()>, BusError> {
        let subscription = self.bus.subscribe(Topic::FinishedJobs).await?;
        info!("Listening for finished jobs");

        let bus = Arc::clone(&self.bus);
        let dispatcher = Arc::clone(self);
        Ok(tokio::spawn(run_consumer(bus, subscription, move |payload| {
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.handle_finished(&payload).await }
        })))
    }
}
