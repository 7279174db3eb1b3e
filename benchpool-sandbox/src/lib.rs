//! benchpool sandbox - formatting and time-boxed execution of Go snippets
//!
//! The formatter canonicalizes code before it is fingerprinted. The runtime
//! writes a snippet into a fresh scratch directory, drives the toolchain
//! against it under a wall-clock deadline and classifies what happened.

mod entry;
mod environment;
mod error;
mod formatter;
mod imports;
mod limits;
mod runtime;
mod types;
mod workspace;

pub use entry::EntryMode;
pub use environment::{HostEnvironment, UNKNOWN_VERSION};
pub use error::{FormatError, SandboxError};
pub use formatter::{Formatter, GoFormatter, DEFAULT_FORMAT_TIMEOUT};
pub use imports::{scan_imports, third_party};
pub use limits::{ResourceLimits, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_MAX_RUN_TIME};
pub use runtime::{Runtime, ToolchainRuntime};
pub use types::{ExecutionReport, ExecutionRequest};
pub use workspace::{Workspace, GO_MOD};
