//! Real toolchain runs. Skipped when `go` / `gofmt` are not installed.

use benchpool_common::{Fingerprint, Outcome};
use benchpool_sandbox::{
    EntryMode, ExecutionRequest, Formatter, GoFormatter, HostEnvironment, ResourceLimits, Runtime,
    ToolchainRuntime, UNKNOWN_VERSION,
};
use benchpool_tests::common::{setup_test_logging, tool_available};
use std::path::Path;
use std::time::Duration;

const UNFORMATTED: &str = "package main\nimport \"fmt\"\nfunc main(){fmt.Println(\"hi\")}";

macro_rules! require {
    ($program:expr, $arg:expr) => {
        if !tool_available($program, $arg) {
            eprintln!("{} not on PATH, skipping", $program);
            return;
        }
    };
}

#[tokio::test]
async fn test_gofmt_canonicalizes_and_fingerprints_stably() {
    setup_test_logging();
    require!("gofmt", "-h");
    let formatter = GoFormatter::new();

    let once = formatter.normalize(UNFORMATTED).await.unwrap();
    assert!(once.ends_with("\tfmt.Println(\"hi\")\n}\n"));
    assert_eq!(formatter.normalize(&once).await.unwrap(), once);

    let spaced = "package main\n\nimport \"fmt\"\n\nfunc main() {\n        fmt.Println(\"hi\")\n}\n";
    assert_eq!(
        Fingerprint::of(&formatter.normalize(spaced).await.unwrap()),
        Fingerprint::of(&once)
    );
}

#[tokio::test]
async fn test_run_mode_prints() {
    setup_test_logging();
    require!("go", "version");
    let code = "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n";

    let report = ToolchainRuntime::new()
        .execute(ExecutionRequest::new(code).with_max_run_time(Duration::from_secs(60)))
        .await
        .unwrap();
    assert_eq!(report.mode, EntryMode::Run);
    assert_eq!(report.outcome, Outcome::Success, "stderr: {}", report.stderr);
    assert_eq!(report.stdout, "hi\n");
}

#[tokio::test]
async fn test_compile_error_is_runtime_error() {
    setup_test_logging();
    require!("go", "version");
    let code = "package main\n\nfunc main() {\n\tundefined()\n}\n";

    let report = ToolchainRuntime::new()
        .execute(ExecutionRequest::new(code).with_max_run_time(Duration::from_secs(60)))
        .await
        .unwrap();
    assert!(matches!(report.outcome, Outcome::RuntimeError(ref msg) if msg.contains("undefined")));
}

#[tokio::test]
async fn test_bench_mode_runs_benchmarks() {
    setup_test_logging();
    require!("go", "version");
    let code = "package main\n\nimport \"testing\"\n\nfunc BenchmarkNoop(b *testing.B) {\n\tfor i := 0; i < b.N; i++ {\n\t}\n}\n";

    let report = ToolchainRuntime::new()
        .execute(ExecutionRequest::new(code).with_max_run_time(Duration::from_secs(120)))
        .await
        .unwrap();
    assert_eq!(report.mode, EntryMode::Bench);
    assert_eq!(report.outcome, Outcome::Success, "stderr: {}", report.stderr);
    assert!(report.stdout.contains("BenchmarkNoop"));
}

#[tokio::test]
async fn test_sleeping_program_times_out() {
    setup_test_logging();
    require!("go", "version");
    let code = "package main\n\nimport \"time\"\n\nfunc main() {\n\ttime.Sleep(time.Minute)\n}\n";

    let runtime = ToolchainRuntime::new()
        .with_limits(ResourceLimits::default().with_max_run_time(Duration::from_secs(3)));
    let report = runtime.execute(ExecutionRequest::new(code)).await.unwrap();
    assert_eq!(report.outcome, Outcome::Timeout);
}

#[tokio::test]
async fn test_host_environment_reports_version() {
    setup_test_logging();
    let missing = HostEnvironment::detect(Path::new("/nonexistent/go")).await;
    assert_eq!(missing.runtime_version, UNKNOWN_VERSION);

    require!("go", "version");
    let env = HostEnvironment::detect(Path::new("go")).await;
    assert!(env.runtime_version.starts_with("go"));
    assert_eq!(env.os, std::env::consts::OS);
}
