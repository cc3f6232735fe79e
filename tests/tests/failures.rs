mod utils;
#[allow(unused)]
use utils::*;

use kvbench::prelude::*;
use mock_store::MemoryStore;
use std::sync::Arc;
use tracing_test::traced_test;

// Captures logs through its own subscriber, so this binary never calls `init`.
#[traced_test]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(10_000)]
async fn failing_store_still_completes() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new().fail_ratio(1.));

    let mut benchmark = Benchmark::with_shared(
        Arc::clone(&store),
        BenchmarkConfig {
            concurrency: 8,
            ..config(&dir, "uniform", 50)
        },
    );
    let report = benchmark.run().await.unwrap();

    assert!(benchmark.latency().is_empty());
    assert_eq!(report.tally.submitted, 50);
    assert_eq!(report.tally.failures, 50);
    assert_eq!(report.tally.error_rate(), 1.);
    assert_eq!(report.statistics, Statistics::default());
    assert_eq!(report.throughput, 0.);
    assert!(store.is_empty());
    assert!(dir.path().join("latency.json").exists());
    assert!(logs_contain("injected failure"));
}
