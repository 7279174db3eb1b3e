//! Toolchain-backed runtime: `go run` / `go test -bench=.` in a scratch directory

use crate::error::SandboxError;
use crate::limits::ResourceLimits;
use crate::types::{ExecutionReport, ExecutionRequest};
use crate::workspace::Workspace;
use async_trait::async_trait;
use benchpool_common::Outcome;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long output readers may run on once the child has been reaped.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Runs snippets through the guest language toolchain as a child process.
///
/// The workspace is handed to the child as its working directory, so any
/// number of executions may run concurrently on one worker.
pub struct ToolchainRuntime {
    program: PathBuf,
    limits: ResourceLimits,
}

impl ToolchainRuntime {
    pub fn new() -> Self {
        Self::with_program("go")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            limits: ResourceLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }
}

impl Default for ToolchainRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl super::Runtime for ToolchainRuntime {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionReport, SandboxError> {
        let mode = request.entry_mode();
        let deadline = request.max_run_time.unwrap_or(self.limits.max_run_time);
        let workspace = Workspace::create(&request.code, mode).await?;

        debug!(
            mode = %mode,
            workspace = %workspace.path().display(),
            deadline_ms = deadline.as_millis() as u64,
            "Starting toolchain"
        );

        let mut command = Command::new(&self.program);
        command
            .args(mode.toolchain_args())
            .current_dir(workspace.path())
            .env("GOTOOLCHAIN", "local")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let pid = child.id();
        let cap = self.limits.max_output_bytes;
        let stdout_capture = child.stdout.take().map(|pipe| spawn_capture(pipe, cap));
        let stderr_capture = child.stderr.take().map(|pipe| spawn_capture(pipe, cap));

        let waited = tokio::time::timeout(deadline, child.wait()).await;
        let status = match waited {
            Ok(Ok(status)) => {
                // The group id stays reserved while any member is alive, so
                // background descendants are still reachable after the reap.
                kill_process_group(pid);
                Some(status)
            }
            Ok(Err(e)) => {
                kill_process_group(pid);
                return Err(SandboxError::Wait(e));
            }
            Err(_) => {
                // The leader is not reaped yet, so its group id is still ours.
                kill_process_group(pid);
                let _ = child.start_kill();
                if let Err(e) = child.wait().await {
                    warn!("Failed to reap timed out process: {}", e);
                }
                None
            }
        };

        let stdout = collect(stdout_capture).await;
        let stderr = collect(stderr_capture).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        drop(workspace);

        let outcome = match status {
            Some(status) => classify(status, &stderr),
            None => Outcome::Timeout,
        };

        debug!(
            mode = %mode,
            outcome = outcome.label(),
            duration_ms,
            "Toolchain finished"
        );

        Ok(ExecutionReport {
            mode,
            stdout,
            stderr,
            outcome,
            exit_code: status.and_then(|s| s.code()),
            duration_ms,
        })
    }

    fn name(&self) -> &str {
        "toolchain"
    }
}

/// Output drained from one pipe so far, plus the task still reading it.
struct Capture {
    kept: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

/// Drain a pipe to EOF, keeping at most `cap` bytes.
fn spawn_capture<R>(mut reader: R, cap: usize) -> Capture
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let kept = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&kept);
    let task = tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let mut kept = sink.lock().unwrap_or_else(PoisonError::into_inner);
                    let room = cap.saturating_sub(kept.len());
                    kept.extend_from_slice(&chunk[..n.min(room)]);
                }
            }
        }
    });
    Capture { kept, task }
}

async fn collect(capture: Option<Capture>) -> String {
    let Some(Capture { kept, mut task }) = capture else {
        return String::new();
    };
    match tokio::time::timeout(READER_GRACE, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Output reader failed: {}", e),
        Err(_) => {
            // A descendant escaped the process group and still holds the pipe.
            task.abort();
            warn!("Output reader outlived the process, keeping what it read");
        }
    }
    let kept = kept.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&kept).into_owned()
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn classify(status: ExitStatus, stderr: &str) -> Outcome {
    if status.success() {
        return Outcome::Success;
    }
    let stderr = stderr.trim();
    if stderr.is_empty() {
        Outcome::RuntimeError(describe_status(status))
    } else {
        Outcome::RuntimeError(stderr.to_string())
    }
}

fn describe_status(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {}", code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {}", signal);
        }
    }
    status.to_string()
}
