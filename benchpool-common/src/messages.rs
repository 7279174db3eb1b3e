//! Wire messages exchanged over the job distribution bus

use crate::fingerprint::Fingerprint;
use crate::model::BenchmarkResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two publish/subscribe topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Dispatcher -> workers
    NewJobs,
    /// Workers -> dispatcher
    FinishedJobs,
}

impl Topic {
    pub fn channel(self) -> &'static str {
        match self {
            Topic::NewJobs => "new-jobs",
            Topic::FinishedJobs => "finished-jobs",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.channel())
    }
}

/// Announces normalized code that needs benchmarking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJobMessage {
    pub hash: Fingerprint,
    pub code: String,
}

/// Announces a finished run. On the wire this is exactly the
/// [`BenchmarkResult`] object, whose `submission_hash` is the correlation key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinishedJobMessage {
    pub result: BenchmarkResult,
}

impl FinishedJobMessage {
    pub fn new(result: BenchmarkResult) -> Self {
        Self { result }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.result.submission_hash
    }

    pub fn into_result(self) -> BenchmarkResult {
        self.result
    }
}

/// Serialize a message into its UTF-8 JSON payload.
pub fn encode<M: Serialize>(message: &M) -> serde_json::Result<String> {
    serde_json::to_string(message)
}

/// Parse a UTF-8 JSON payload into a message.
pub fn decode<M: DeserializeOwned>(payload: &str) -> serde_json::Result<M> {
    serde_json::from_str(payload)
}
