//! Request and report types for sandbox execution

use crate::entry::EntryMode;
use benchpool_common::Outcome;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request to execute a snippet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Normalized source text
    pub code: String,

    /// Forced entry mode (None = detect from the code)
    #[serde(default)]
    pub mode: Option<EntryMode>,

    /// Deadline override (None = the runtime's configured limit)
    #[serde(default, with = "humantime_serde")]
    pub max_run_time: Option<Duration>,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            mode: None,
            max_run_time: None,
        }
    }

    pub fn with_mode(mut self, mode: EntryMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_max_run_time(mut self, max_run_time: Duration) -> Self {
        self.max_run_time = Some(max_run_time);
        self
    }

    /// Entry mode this request will run in
    pub fn entry_mode(&self) -> EntryMode {
        self.mode.unwrap_or_else(|| EntryMode::detect(&self.code))
    }
}

/// Captured output and classification of one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub mode: EntryMode,
    pub stdout: String,
    pub stderr: String,
    pub outcome: Outcome,

    /// Exit code when the process exited on its own
    pub exit_code: Option<i32>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionReport {
    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }
}
