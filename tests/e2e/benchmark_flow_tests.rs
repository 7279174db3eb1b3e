//! Full submission flows: intake, distribution, execution, aggregation

use benchpool_common::{messages, Fingerprint, NewJobMessage, Outcome, Topic};
use benchpool_core::{JobBus, MemoryBus, MemoryStore, SubmissionStore};
use benchpool_sandbox::{Formatter, GoFormatter, HostEnvironment, ResourceLimits, ToolchainRuntime};
use benchpool_tests::common::{setup_test_logging, tool_available, wait_until, Cluster, LineFormatter};
use benchpool_transport::{Dispatcher, SubmitOutcome, Worker};
use std::sync::Arc;
use std::time::Duration;

async fn await_results(store: &Arc<MemoryStore>, hash: &Fingerprint, count: usize, within: Duration) -> bool {
    wait_until(within, || {
        let store = store.clone();
        let hash = hash.clone();
        async move {
            store
                .get(&hash)
                .await
                .unwrap()
                .map(|s| s.results.len() >= count)
                .unwrap_or(false)
        }
    })
    .await
}

#[tokio::test]
async fn test_submit_execute_merge_then_cached() {
    setup_test_logging();
    let cluster = Cluster::start(1).await;
    let code = "package main\nimport \"fmt\"\nfunc main() {\nfmt.Println(\"hi\")\n}";

    let normalized = LineFormatter.normalize(code).await.unwrap();
    assert!(normalized.ends_with("\tfmt.Println(\"hi\")\n}\n"));
    let hash = Fingerprint::of(&normalized);

    let mut jobs = cluster.bus.subscribe(Topic::NewJobs).await.unwrap();
    assert_eq!(
        cluster.dispatcher.submit(code).await.unwrap(),
        SubmitOutcome::Submitted(hash.clone())
    );
    let job: NewJobMessage = messages::decode(&jobs.next().await.unwrap()).unwrap();
    assert_eq!(job.hash, hash);
    assert_eq!(job.code, normalized);

    assert!(await_results(&cluster.store, &hash, 1, Duration::from_secs(2)).await);
    let record = cluster.store.get(&hash).await.unwrap().unwrap();
    assert_eq!(record.results[0].outcome, Outcome::Success);
    assert!(record.results[0].stdout.contains("hi"));

    let respaced = "package main\n\n   import \"fmt\"\nfunc main() {\n      fmt.Println(\"hi\")\n}\n\n";
    let outcome = cluster.dispatcher.submit(respaced).await.unwrap();
    match outcome {
        SubmitOutcome::Cached(text) => assert!(text.contains("stdout:<br>hi<br>")),
        other => panic!("expected cached results, got {:?}", other),
    }
    assert!(tokio::time::timeout(Duration::from_millis(100), jobs.next())
        .await
        .is_err());
    assert_eq!(cluster.runtime.executions(), 1);
}

#[tokio::test]
async fn test_concurrent_duplicate_submissions_keep_record_whole() {
    setup_test_logging();
    let cluster = Cluster::start(2).await;
    let code = "package main\nfunc main() {\nfmt.Println(\"dup\")\n}\n";

    let (a, b) = tokio::join!(
        cluster.dispatcher.submit(code),
        cluster.dispatcher.submit(code)
    );
    let (SubmitOutcome::Submitted(ha), SubmitOutcome::Submitted(hb)) = (a.unwrap(), b.unwrap()) else {
        panic!("both submissions should publish");
    };
    assert_eq!(ha, hb);

    // Two jobs, two workers each: four results, all merged.
    assert!(await_results(&cluster.store, &ha, 4, Duration::from_secs(3)).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let record = cluster.store.get(&ha).await.unwrap().unwrap();
    assert_eq!(record.results.len(), 4);
    assert_eq!(record.hash, ha);
    assert!(record.results.iter().all(|r| r.submission_hash == ha));
    assert_eq!(cluster.store.len().await, 1);
}

#[tokio::test]
async fn test_real_toolchain_round_trip() {
    setup_test_logging();
    if !tool_available("go", "version") || !tool_available("gofmt", "-h") {
        eprintln!("go toolchain not on PATH, skipping");
        return;
    }

    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(MemoryBus::new());
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        bus.clone(),
        Arc::new(GoFormatter::new()),
    ));
    let merge_loop = dispatcher.spawn_merge_loop().await.unwrap();
    // Generous limit: the first build fills the toolchain's compile cache.
    let runtime = ToolchainRuntime::new()
        .with_limits(ResourceLimits::default().with_max_run_time(Duration::from_secs(60)));
    let environment = HostEnvironment::detect(runtime.program()).await;
    let worker = Arc::new(Worker::new(bus.clone(), Arc::new(runtime), environment))
        .start()
        .await
        .unwrap();

    let code = "package main\nimport \"fmt\"\nfunc main(){fmt.Println(\"hi\")}";
    let SubmitOutcome::Submitted(hash) = dispatcher.submit(code).await.unwrap() else {
        panic!("first submission should publish");
    };
    assert!(await_results(&store, &hash, 1, Duration::from_secs(60)).await);

    let record = store.get(&hash).await.unwrap().unwrap();
    assert!(record.code.ends_with("\tfmt.Println(\"hi\")\n}\n"));
    assert_eq!(record.results[0].outcome, Outcome::Success);
    assert_eq!(record.results[0].stdout, "hi\n");

    let again = "package main\n\nimport \"fmt\"\n\nfunc main() {\n    fmt.Println(\"hi\")\n}\n";
    assert!(matches!(
        dispatcher.submit(again).await.unwrap(),
        SubmitOutcome::Cached(text) if text.contains("hi")
    ));

    worker.abort();
    merge_loop.abort();
}
