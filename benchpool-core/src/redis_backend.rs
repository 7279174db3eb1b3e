//! Redis implementations of the store and the bus
//!
//! Commands share one multiplexed [`ConnectionManager`], which reconnects
//! on its own. Each subscription opens a dedicated pub/sub connection.

use crate::bus::{JobBus, Subscription};
use crate::error::{BusError, StoreError};
use crate::store::{decode_record, encode_record, SubmissionStore};
use async_trait::async_trait;
use benchpool_common::{Fingerprint, Submission, Topic};
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One Redis deployment, opened once at startup and handed to the
/// dispatcher and workers as trait objects.
#[derive(Clone)]
pub struct RedisConnection {
    client: Client,
    manager: ConnectionManager,
}

impl RedisConnection {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client.clone()).await?;
        info!("Connected to redis at {}", redact(url));
        Ok(Self { client, manager })
    }

    pub fn store(&self) -> Arc<dyn SubmissionStore> {
        Arc::new(RedisStore {
            manager: self.manager.clone(),
        })
    }

    pub fn bus(&self) -> Arc<dyn JobBus> {
        Arc::new(RedisBus {
            client: self.client.clone(),
            manager: self.manager.clone(),
        })
    }
}

/// Strip credentials before a URL reaches the logs.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}://***{}", &url[..scheme], &url[at..]),
        _ => url.to_string(),
    }
}

/// Submissions stored as JSON strings under their fingerprint, no expiry.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

#[async_trait]
impl SubmissionStore for RedisStore {
    async fn get(&self, hash: &Fingerprint) -> Result<Option<Submission>, StoreError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(hash.as_str()).await?;
        raw.map(|raw| decode_record(hash.as_str(), &raw)).transpose()
    }

    async fn put(&self, submission: &Submission) -> Result<(), StoreError> {
        let record = encode_record(submission)?;
        let mut conn = self.manager.clone();
        let _: () = conn.set(submission.hash.as_str(), record).await?;
        Ok(())
    }

    async fn create(&self, submission: &Submission) -> Result<bool, StoreError> {
        let record = encode_record(submission)?;
        let mut conn = self.manager.clone();
        let created: bool = conn.set_nx(submission.hash.as_str(), record).await?;
        Ok(created)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct RedisBus {
    client: Client,
    manager: ConnectionManager,
}

#[async_trait]
impl JobBus for RedisBus {
    async fn publish(&self, topic: Topic, payload: &str) -> Result<(), BusError> {
        let mut conn = self.manager.clone();
        let receivers: i64 = conn
            .publish(topic.channel(), payload)
            .await
            .map_err(|e| BusError::Publish {
                topic,
                message: e.to_string(),
            })?;
        if receivers == 0 {
            warn!(topic = %topic, "Published with no subscribers listening");
        } else {
            debug!(topic = %topic, receivers, "Published");
        }
        Ok(())
    }

    async fn subscribe(&self, topic: Topic) -> Result<Subscription, BusError> {
        let subscribe_error = |e: redis::RedisError| BusError::Subscribe {
            topic,
            message: e.to_string(),
        };
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(subscribe_error)?;
        pubsub.subscribe(topic.channel()).await.map_err(subscribe_error)?;
        debug!(topic = %topic, "Subscribed");

        let payloads = pubsub.into_on_message().filter_map(move |msg| {
            futures::future::ready(match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(topic = %topic, "Dropping unreadable payload: {}", e);
                    None
                }
            })
        });
        Ok(Subscription::new(topic, payloads))
    }
}
