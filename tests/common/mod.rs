//! Common test utilities shared across integration and E2E tests

use async_trait::async_trait;
use benchpool_common::Outcome;
use benchpool_core::{JobBus, MemoryBus, MemoryStore, SubmissionStore};
use benchpool_sandbox::{
    ExecutionReport, ExecutionRequest, FormatError, Formatter, HostEnvironment, Runtime,
    SandboxError,
};
use benchpool_transport::{start_server, Dispatcher, HttpState, Worker};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Setup logging for tests
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Whether `program` can be started at all.
pub fn tool_available(program: &str, arg: &str) -> bool {
    std::process::Command::new(program)
        .arg(arg)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check().await
}

/// Stand-in for gofmt: trims every line, drops blank ones, and indents
/// lines inside braces with one tab. Rejects anything containing "fun ".
pub struct LineFormatter;

impl LineFormatter {
    fn canonical(code: &str) -> String {
        let mut depth = 0usize;
        let mut out = String::new();
        for line in code.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.starts_with('}') {
                depth = depth.saturating_sub(1);
            }
            out.push_str(&"\t".repeat(depth));
            out.push_str(line);
            out.push('\n');
            if line.ends_with('{') {
                depth += 1;
            }
        }
        out
    }
}

#[async_trait]
impl Formatter for LineFormatter {
    async fn format(&self, code: &str, _organize_imports: bool) -> Result<String, FormatError> {
        if code.contains("fun ") {
            return Err(FormatError::Rejected(
                "<standard input>:2:1: expected declaration, found fun".to_string(),
            ));
        }
        Ok(Self::canonical(code))
    }
}

/// Stand-in for the toolchain: prints every `Println("...")` argument,
/// times out on code mentioning `time.Sleep`, and counts executions.
#[derive(Default)]
pub struct ScriptedRuntime {
    executions: AtomicUsize,
}

impl ScriptedRuntime {
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Runtime for ScriptedRuntime {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionReport, SandboxError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let mode = request.entry_mode();
        if request.code.contains("time.Sleep") {
            return Ok(ExecutionReport {
                mode,
                stdout: String::new(),
                stderr: String::new(),
                outcome: Outcome::Timeout,
                exit_code: None,
                duration_ms: 10_000,
            });
        }

        let mut stdout = String::new();
        for piece in request.code.split("Println(\"").skip(1) {
            if let Some(end) = piece.find("\")") {
                stdout.push_str(&piece[..end]);
                stdout.push('\n');
            }
        }
        Ok(ExecutionReport {
            mode,
            stdout,
            stderr: String::new(),
            outcome: Outcome::Success,
            exit_code: Some(0),
            duration_ms: 5,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A dispatcher and `workers` workers wired over the in-memory store and bus.
pub struct Cluster {
    pub store: Arc<MemoryStore>,
    pub bus: Arc<MemoryBus>,
    pub runtime: Arc<ScriptedRuntime>,
    pub dispatcher: Arc<Dispatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl Cluster {
    pub async fn start(workers: usize) -> Self {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(MemoryBus::new());
        let runtime = Arc::new(ScriptedRuntime::default());

        let store_dyn: Arc<dyn SubmissionStore> = store.clone();
        let bus_dyn: Arc<dyn JobBus> = bus.clone();
        let dispatcher = Arc::new(Dispatcher::new(
            store_dyn,
            Arc::clone(&bus_dyn),
            Arc::new(LineFormatter),
        ));

        let mut tasks = vec![dispatcher.spawn_merge_loop().await.unwrap()];
        for _ in 0..workers {
            let worker = Worker::new(
                Arc::clone(&bus_dyn),
                runtime.clone(),
                HostEnvironment::with_version("go1.22.0"),
            );
            tasks.push(Arc::new(worker).start().await.unwrap());
        }

        Self {
            store,
            bus,
            runtime,
            dispatcher,
            tasks,
        }
    }

    /// Serve the HTTP intake on an ephemeral port.
    pub async fn serve(&mut self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = HttpState::new(self.dispatcher.clone());
        self.tasks.push(tokio::spawn(async move {
            let _ = start_server(listener, state).await;
        }));
        format!("http://{}", addr)
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
