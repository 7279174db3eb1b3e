//! Submissions and the benchmark results accumulated against them

use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified result of one sandboxed execution.
///
/// Carried as data inside [`BenchmarkResult`] so a submitter always learns
/// why their code failed instead of the job disappearing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    RuntimeError(String),
    Timeout,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::RuntimeError(_) => "runtime_error",
            Outcome::Timeout => "timeout",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::RuntimeError(message) => write!(f, "error: {}", message),
            Outcome::Timeout => f.write_str("error: process took too long"),
        }
    }
}

/// One execution of a submission on one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Lookup key of the submission this result belongs to
    pub submission_hash: Fingerprint,
    pub created: DateTime<Utc>,
    pub runtime_version: String,
    pub os: String,
    pub arch: String,
    pub core_count: usize,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub outcome: Outcome,
}

fn html_lines(text: &str) -> String {
    text.replace('\n', "<br>")
}

// Rendered for the browser client, which shows the message as HTML.
impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.outcome.is_success() {
            write!(f, "{}<br>", html_lines(&self.outcome.to_string()))?;
        }
        write!(f, "cores: {}<br>", self.core_count)?;
        if !self.stdout.is_empty() {
            write!(f, "stdout:<br>{}", html_lines(&self.stdout))?;
        }
        if !self.stderr.is_empty() {
            write!(f, "stderr:<br>{}", html_lines(&self.stderr))?;
        }
        Ok(())
    }
}

/// A unique piece of normalized code plus every result recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub created: DateTime<Utc>,
    pub code: String,
    pub hash: Fingerprint,
    #[serde(default)]
    pub results: Vec<BenchmarkResult>,
}

impl Submission {
    /// Build a fresh record; the hash is always derived from `code`.
    pub fn new(normalized_code: impl Into<String>) -> Self {
        let code = normalized_code.into();
        Self {
            created: Utc::now(),
            hash: Fingerprint::of(&code),
            code,
            results: Vec::new(),
        }
    }

    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn push_result(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    /// Every result's rendering, in the order they were merged.
    pub fn aggregated_text(&self) -> String {
        self.results.iter().map(ToString::to_string).collect()
    }
}
