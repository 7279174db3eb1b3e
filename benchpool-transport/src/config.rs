//! Configuration for the server and worker processes

use crate::error::ConfigError;
use benchpool_sandbox::{GoFormatter, ResourceLimits, ToolchainRuntime, DEFAULT_FORMAT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "benchpool.toml";

pub const ENV_REDIS_URL: &str = "BENCHPOOL_REDIS_URL";
pub const ENV_BIND_ADDR: &str = "BENCHPOOL_BIND_ADDR";
pub const ENV_MAX_RUN_TIME: &str = "BENCHPOOL_MAX_RUN_TIME";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub formatter: FormatterConfig,
}

/// Shared store and bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_url")]
    pub url: String,
}

impl StoreConfig {
    fn default_url() -> String {
        "redis://127.0.0.1:6379".to_string()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind_addr")]
    pub bind_addr: String,
}

impl ServerConfig {
    fn default_bind_addr() -> String {
        "0.0.0.0:8080".to_string()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: Self::default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "SandboxConfig::default_go_binary")]
    pub go_binary: PathBuf,
    #[serde(flatten)]
    pub limits: ResourceLimits,
}

impl SandboxConfig {
    fn default_go_binary() -> PathBuf {
        PathBuf::from("go")
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            go_binary: Self::default_go_binary(),
            limits: ResourceLimits::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    #[serde(default = "FormatterConfig::default_gofmt")]
    pub gofmt: PathBuf,
    #[serde(default = "FormatterConfig::default_goimports")]
    pub goimports: PathBuf,
    #[serde(with = "humantime_serde", default = "FormatterConfig::default_timeout")]
    pub timeout: Duration,
}

impl FormatterConfig {
    fn default_gofmt() -> PathBuf {
        PathBuf::from("gofmt")
    }

    fn default_goimports() -> PathBuf {
        PathBuf::from("goimports")
    }

    fn default_timeout() -> Duration {
        DEFAULT_FORMAT_TIMEOUT
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            gofmt: Self::default_gofmt(),
            goimports: Self::default_goimports(),
            timeout: Self::default_timeout(),
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with `path` (or `./benchpool.toml` if present),
    /// overlaid with `BENCHPOOL_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_REDIS_URL) {
            self.store.url = url;
        }
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.server.bind_addr = addr;
        }
        if let Some(raw) = lookup(ENV_MAX_RUN_TIME) {
            self.sandbox.limits.max_run_time =
                humantime_serde::re::humantime::parse_duration(&raw).map_err(|e| {
                    ConfigError::Env {
                        var: ENV_MAX_RUN_TIME,
                        message: e.to_string(),
                    }
                })?;
        }
        Ok(())
    }

    pub fn runtime(&self) -> ToolchainRuntime {
        ToolchainRuntime::with_program(&self.sandbox.go_binary).with_limits(self.sandbox.limits.clone())
    }

    pub fn formatter(&self) -> GoFormatter {
        GoFormatter::with_tools(&self.formatter.gofmt, &self.formatter.goimports)
            .with_timeout(self.formatter.timeout)
    }
}
