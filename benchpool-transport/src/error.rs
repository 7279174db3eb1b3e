use benchpool_core::{BusError, StoreError};
use benchpool_sandbox::{FormatError, SandboxError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("formatting failed: {0}")]
    Format(#[from] FormatError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("malformed finished-job message: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("malformed job message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("sandbox failure: {0}")]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Bus(#[from] BusError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
