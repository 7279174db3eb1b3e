//! Canonical formatting of submitted code
//!
//! Submissions are fingerprinted after formatting, so two snippets that
//! differ only in layout share one cache entry.

use crate::error::FormatError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Upper bound for a single formatter invocation.
pub const DEFAULT_FORMAT_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Formatter: Send + Sync {
    /// Reformat `code`, optionally also organizing its imports.
    ///
    /// On error the returned text must not be trusted; callers report the
    /// error and keep the original code.
    async fn format(&self, code: &str, organize_imports: bool) -> Result<String, FormatError>;

    /// The formatting applied before fingerprinting.
    async fn normalize(&self, code: &str) -> Result<String, FormatError> {
        self.format(code, false).await
    }
}

/// `gofmt -s -e`, followed by `goimports` when imports are organized.
#[derive(Debug, Clone)]
pub struct GoFormatter {
    gofmt: PathBuf,
    goimports: PathBuf,
    timeout: Duration,
}

impl GoFormatter {
    pub fn new() -> Self {
        Self::with_tools("gofmt", "goimports")
    }

    pub fn with_tools(gofmt: impl Into<PathBuf>, goimports: impl Into<PathBuf>) -> Self {
        Self {
            gofmt: gofmt.into(),
            goimports: goimports.into(),
            timeout: DEFAULT_FORMAT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pipe `input` through `tool`, treating any stderr output as a rejection.
    async fn run_tool(&self, tool: &Path, args: &[&str], input: &str) -> Result<String, FormatError> {
        let name = tool.display().to_string();
        let mut child = Command::new(tool)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FormatError::Tool {
                tool: name.clone(),
                source,
            })?;

        // Written from a separate task so a chatty tool cannot deadlock us.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.as_bytes().to_vec();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    debug!("Formatter input not fully written: {}", e);
                }
            })
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| FormatError::TimedOut {
                tool: name.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| FormatError::Tool {
                tool: name.clone(),
                source,
            })?;

        if let Some(writer) = writer {
            let _ = writer.await;
        }

        let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !diagnostics.is_empty() {
            debug!(tool = %name, "Formatter rejected input: {}", diagnostics);
            return Err(FormatError::Rejected(diagnostics));
        }
        if !output.status.success() {
            return Err(FormatError::Rejected(format!(
                "{} exited with {}",
                name, output.status
            )));
        }

        String::from_utf8(output.stdout).map_err(|_| FormatError::Encoding { tool: name })
    }
}

impl Default for GoFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Formatter for GoFormatter {
    async fn format(&self, code: &str, organize_imports: bool) -> Result<String, FormatError> {
        let formatted = self.run_tool(&self.gofmt, &["-s", "-e"], code).await?;
        if !organize_imports {
            return Ok(formatted);
        }
        self.run_tool(&self.goimports, &[], &formatted).await
    }
}
