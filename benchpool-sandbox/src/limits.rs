//! Resource limits for sandboxed execution

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wall-clock budget applied when nothing else is configured.
pub const DEFAULT_MAX_RUN_TIME: Duration = Duration::from_secs(10);

/// Per-stream output cap applied when nothing else is configured.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Resource limits for one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Hard wall-clock deadline; the process group is killed when it elapses
    #[serde(with = "humantime_serde", default = "default_max_run_time")]
    pub max_run_time: Duration,

    /// Bytes kept from each of stdout and stderr; the rest is dropped
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_max_run_time() -> Duration {
    DEFAULT_MAX_RUN_TIME
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_run_time: DEFAULT_MAX_RUN_TIME,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ResourceLimits {
    pub fn with_max_run_time(mut self, max_run_time: Duration) -> Self {
        self.max_run_time = max_run_time;
        self
    }

    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }
}
