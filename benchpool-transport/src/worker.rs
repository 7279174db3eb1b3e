//! Job execution loop

use crate::error::WorkerError;
use benchpool_common::{messages, BenchmarkResult, FinishedJobMessage, NewJobMessage, Topic};
use benchpool_core::{publish_message, run_consumer, BusError, JobBus};
use benchpool_sandbox::{scan_imports, third_party, ExecutionRequest, HostEnvironment, Runtime};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct Worker {
    bus: Arc<dyn JobBus>,
    runtime: Arc<dyn Runtime>,
    environment: HostEnvironment,
}

impl Worker {
    pub fn new(bus: Arc<dyn JobBus>, runtime: Arc<dyn Runtime>, environment: HostEnvironment) -> Self {
        Self {
            bus,
            runtime,
            environment,
        }
    }

    /// Execute one job payload and build the message announcing its result.
    pub async fn process(&self, payload: &str) -> Result<FinishedJobMessage, WorkerError> {
        let job: NewJobMessage = messages::decode(payload).map_err(WorkerError::Decode)?;

        let imports = scan_imports(&job.code);
        let external = third_party(&imports);
        if !external.is_empty() {
            // Fetching dependencies is not supported; the toolchain will fail on them.
            warn!(hash = %job.hash, imports = ?external, "Third-party imports are not fetched");
        }

        let report = self.runtime.execute(ExecutionRequest::new(job.code)).await?;
        info!(
            hash = %job.hash,
            mode = %report.mode,
            outcome = report.outcome.label(),
            duration_ms = report.duration_ms,
            "Job executed"
        );

        let env = &self.environment;
        Ok(FinishedJobMessage::new(BenchmarkResult {
            submission_hash: job.hash,
            created: Utc::now(),
            runtime_version: env.runtime_version.clone(),
            os: env.os.clone(),
            arch: env.arch.clone(),
            core_count: env.core_count,
            stdout: report.stdout,
            stderr: report.stderr,
            outcome: report.outcome,
        }))
    }

    async fn handle(&self, payload: &str) {
        let finished = match self.process(payload).await {
            Ok(finished) => finished,
            Err(e) => {
                error!("Skipping job: {}", e);
                return;
            }
        };
        if let Err(e) = publish_message(self.bus.as_ref(), Topic::FinishedJobs, &finished).await {
            error!(hash = %finished.fingerprint(), "Failed to publish result: {}", e);
        }
    }

    /// Subscribe to new jobs and process them in the background, one at a
    /// time. Fails if the subscription cannot be established.
    pub async fn start(self: Arc<Self>) -> Result<JoinHandle<()>, BusError> {
        let subscription = self.bus.subscribe(Topic::NewJobs).await?;
        info!(
            runtime = self.runtime.name(),
            version = %self.environment.runtime_version,
            cores = self.environment.core_count,
            "Worker ready"
        );

        let bus = Arc::clone(&self.bus);
        Ok(tokio::spawn(run_consumer(bus, subscription, move |payload| {
            let worker = Arc::clone(&self);
            async move { worker.handle(&payload).await }
        })))
    }

    /// Run until the process is stopped.
    pub async fn run(self: Arc<Self>) -> Result<(), WorkerError> {
        let handle = self.start().await?;
        if let Err(e) = handle.await {
            error!("Worker loop stopped: {}", e);
        }
        Ok(())
    }
}
