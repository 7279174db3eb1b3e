//! In-process store and bus for single-binary runs and tests

use crate::bus::{JobBus, Subscription};
use crate::error::{BusError, StoreError};
use crate::store::SubmissionStore;
use async_trait::async_trait;
use benchpool_common::{Fingerprint, Submission, Topic};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{trace, warn};

const TOPIC_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Fingerprint, Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn get(&self, hash: &Fingerprint) -> Result<Option<Submission>, StoreError> {
        Ok(self.records.read().await.get(hash).cloned())
    }

    async fn put(&self, submission: &Submission) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(submission.hash.clone(), submission.clone());
        Ok(())
    }

    async fn create(&self, submission: &Submission) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&submission.hash) {
            return Ok(false);
        }
        records.insert(submission.hash.clone(), submission.clone());
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Broadcast channel per topic. A subscriber that falls more than
/// `TOPIC_CAPACITY` messages behind skips the overflow.
#[derive(Debug)]
pub struct MemoryBus {
    new_jobs: broadcast::Sender<String>,
    finished_jobs: broadcast::Sender<String>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            new_jobs: broadcast::channel(TOPIC_CAPACITY).0,
            finished_jobs: broadcast::channel(TOPIC_CAPACITY).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<String> {
        match topic {
            Topic::NewJobs => &self.new_jobs,
            Topic::FinishedJobs => &self.finished_jobs,
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.sender(topic).receiver_count()
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobBus for MemoryBus {
    async fn publish(&self, topic: Topic, payload: &str) -> Result<(), BusError> {
        // No receivers is not an error: the message is simply dropped.
        let delivered = self.sender(topic).send(payload.to_string()).unwrap_or(0);
        trace!(topic = %topic, delivered, "Published");
        Ok(())
    }

    async fn subscribe(&self, topic: Topic) -> Result<Subscription, BusError> {
        let receiver = self.sender(topic).subscribe();
        let payloads = BroadcastStream::new(receiver).filter_map(move |item| {
            futures::future::ready(match item {
                Ok(payload) => Some(payload),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(topic = %topic, skipped, "Subscriber lagged, messages dropped");
                    None
                }
            })
        });
        Ok(Subscription::new(topic, payloads))
    }
}
