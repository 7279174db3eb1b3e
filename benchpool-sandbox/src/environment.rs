//! Execution environment descriptors attached to every result

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::warn;

/// Reported when the toolchain version cannot be determined.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Where a result was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEnvironment {
    pub runtime_version: String,
    pub os: String,
    pub arch: String,
    pub core_count: usize,
}

impl HostEnvironment {
    /// Describe this machine, asking `toolchain` for its version.
    pub async fn detect(toolchain: &Path) -> Self {
        let runtime_version = match toolchain_version(toolchain).await {
            Some(version) => version,
            None => {
                warn!(
                    toolchain = %toolchain.display(),
                    "Could not determine toolchain version"
                );
                UNKNOWN_VERSION.to_string()
            }
        };
        Self::with_version(runtime_version)
    }

    /// Describe this machine with a known toolchain version.
    pub fn with_version(runtime_version: impl Into<String>) -> Self {
        Self {
            runtime_version: runtime_version.into(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            core_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

async fn toolchain_version(toolchain: &Path) -> Option<String> {
    let output = Command::new(toolchain)
        .args(["env", "GOVERSION"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!version.is_empty()).then_some(version)
}
