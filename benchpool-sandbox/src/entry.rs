//! Choosing how a snippet is run

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

fn main_func() -> &'static Regex {
    static MAIN: OnceLock<Regex> = OnceLock::new();
    MAIN.get_or_init(|| Regex::new(r"(?m)^func\s+main\s*\(\s*\)").expect("static regex"))
}

/// How the toolchain is driven for a snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// The snippet has a `main` function: `go run main.go`
    Run,
    /// Only test/benchmark functions: `go test -bench=.`
    Bench,
}

impl EntryMode {
    pub fn detect(code: &str) -> Self {
        if main_func().is_match(code) {
            EntryMode::Run
        } else {
            EntryMode::Bench
        }
    }

    /// File name the snippet is written to inside the workspace
    pub fn file_name(self) -> &'static str {
        match self {
            EntryMode::Run => "main.go",
            EntryMode::Bench => "main_test.go",
        }
    }

    /// Toolchain sub-command and arguments
    pub fn toolchain_args(self) -> &'static [&'static str] {
        match self {
            EntryMode::Run => &["run", "main.go"],
            EntryMode::Bench => &["test", "-bench=."],
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryMode::Run => f.write_str("run"),
            EntryMode::Bench => f.write_str("bench"),
        }
    }
}
