//! Runtime trait and implementations

mod toolchain;

use crate::error::SandboxError;
use crate::types::{ExecutionRequest, ExecutionReport};
use async_trait::async_trait;

pub use toolchain::ToolchainRuntime;

/// Executes a snippet and classifies what happened
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Run the code to completion or until its deadline.
    ///
    /// `Err` means the sandbox itself failed; anything the code did,
    /// including crashing or hanging, is reported in the `Ok` report.
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionReport, SandboxError>;

    /// Get runtime name
    fn name(&self) -> &str;
}
