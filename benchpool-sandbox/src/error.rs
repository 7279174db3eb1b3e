//! Error types for formatting and execution

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The formatter refused or failed to format the code. The diagnostic is
/// shown to the submitter verbatim.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{0}")]
    Rejected(String),

    #[error("failed to run {tool}: {source}")]
    Tool {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} produced non UTF-8 output")]
    Encoding { tool: String },

    #[error("{tool} did not finish within {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },
}

/// The sandbox could not get as far as running the code. Distinct from an
/// [`Outcome`](benchpool_common::Outcome), which reports how the code
/// itself behaved.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to prepare workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to write {path}: {source}")]
    WriteSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for child process: {0}")]
    Wait(#[source] std::io::Error),
}
