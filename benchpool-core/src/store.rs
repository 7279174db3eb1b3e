//! Keyed persistence of submissions

use crate::error::StoreError;
use async_trait::async_trait;
use benchpool_common::{Fingerprint, Submission};

/// Record store shared by every server and worker. Records are keyed by
/// their fingerprint's hex form and never expire.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn get(&self, hash: &Fingerprint) -> Result<Option<Submission>, StoreError>;

    /// Overwrite the record stored under `submission.hash`.
    async fn put(&self, submission: &Submission) -> Result<(), StoreError>;

    /// Store `submission` only if nothing is stored under its hash yet.
    /// Returns `false` when another writer got there first.
    async fn create(&self, submission: &Submission) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub(crate) fn encode_record(submission: &Submission) -> Result<String, StoreError> {
    serde_json::to_string(submission).map_err(StoreError::Encode)
}

pub(crate) fn decode_record(key: &str, raw: &str) -> Result<Submission, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}
