//! Topic-based publish/subscribe used to fan jobs out and results back in
//!
//! Delivery is fire-and-forget: a message published while nobody is
//! subscribed is lost, and every subscriber sees every message published
//! after its subscription was confirmed.

use crate::error::BusError;
use async_trait::async_trait;
use benchpool_common::{messages, Topic};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause between attempts to re-establish a broken subscription.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

#[async_trait]
pub trait JobBus: Send + Sync {
    async fn publish(&self, topic: Topic, payload: &str) -> Result<(), BusError>;

    /// Returns once the subscription is confirmed, so anything published
    /// afterwards is guaranteed to be seen.
    async fn subscribe(&self, topic: Topic) -> Result<Subscription, BusError>;
}

/// A live subscription. Dropping it unsubscribes.
pub struct Subscription {
    topic: Topic,
    payloads: Pin<Box<dyn Stream<Item = String> + Send>>,
}

impl Subscription {
    pub fn new(topic: Topic, payloads: impl Stream<Item = String> + Send + 'static) -> Self {
        Self {
            topic,
            payloads: Box::pin(payloads),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Next payload in publish order. `None` means the underlying
    /// connection is gone and the subscription has to be re-established.
    pub async fn next(&mut self) -> Option<String> {
        self.payloads.next().await
    }

    /// Unsubscribe. Equivalent to dropping the subscription.
    pub fn close(self) {
        debug!(topic = %self.topic, "Unsubscribed");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

/// Encode `message` as JSON and publish it on `topic`.
pub async fn publish_message<M>(bus: &dyn JobBus, topic: Topic, message: &M) -> Result<(), BusError>
where
    M: Serialize + Sync,
{
    let payload = messages::encode(message)?;
    bus.publish(topic, &payload).await
}

/// Feed every payload arriving on `subscription` to `handler`, forever.
///
/// When the subscription ends it is re-established on `bus`; payloads
/// published in between are lost. Handlers run one at a time.
pub async fn run_consumer<F, Fut>(bus: Arc<dyn JobBus>, mut subscription: Subscription, mut handler: F)
where
    F: FnMut(String) -> Fut + Send,
    Fut: Future<Output = ()> + Send,
{
    let topic = subscription.topic();
    loop {
        while let Some(payload) = subscription.next().await {
            handler(payload).await;
        }

        warn!(topic = %topic, "Subscription ended, resubscribing");
        subscription = loop {
            tokio::time::sleep(RESUBSCRIBE_DELAY).await;
            match bus.subscribe(topic).await {
                Ok(subscription) => {
                    info!(topic = %topic, "Resubscribed");
                    break subscription;
                }
                Err(e) => error!("Resubscribe failed: {}", e),
            }
        };
        debug!(topic = %topic, "Consumer resumed");
    }
}
