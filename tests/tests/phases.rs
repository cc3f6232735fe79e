mod utils;
#[allow(unused)]
use utils::*;

use kvbench::prelude::*;
use kvbench::Phase;
use mock_store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn ordered_run_against_store() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let mut benchmark = Benchmark::with_shared(
        Arc::clone(&store),
        BenchmarkConfig {
            keys: 10,
            ..config(&dir, "order", 10)
        },
    );
    let report = benchmark.run().await.unwrap();

    let history = store.history();
    assert_eq!(
        history.iter().map(|w| w.key).collect::<Vec<_>>(),
        (0..10).collect::<Vec<_>>()
    );
    assert_eq!(
        history.iter().map(|w| w.sequence).collect::<Vec<_>>(),
        (0..10).collect::<Vec<_>>()
    );
    assert_eq!(benchmark.latency().len(), 10);
    assert_eq!(report.statistics.count, 10);
    assert_eq!((store.inits(), store.stops()), (1, 1));

    let json: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(dir.path().join("latency.json")).unwrap())
            .unwrap();
    assert_eq!(json["phase"], "run");
    assert_eq!(json["distribution"], "order");
    assert_eq!(json["tally"]["submitted"], 10);
    assert_eq!(json["statistics"]["count"], 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(10_000)]
async fn full_conflict_only_touches_hot_key() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let mut benchmark = Benchmark::with_shared(
        Arc::clone(&store),
        BenchmarkConfig {
            conflicts: 100,
            concurrency: 4,
            ..config(&dir, "conflict", 200)
        },
    );
    benchmark.run().await.unwrap();

    let history = store.history();
    assert_eq!(history.len(), 200);
    assert!(history.iter().all(|w| w.key == 0));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn load_primes_every_key_then_run_continues() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let mut benchmark = Benchmark::with_shared(
        Arc::clone(&store),
        BenchmarkConfig {
            keys: 20,
            min_key: 100,
            write_ratio: 0.25,
            ..config(&dir, "uniform", 10)
        },
    );

    let load = benchmark.load().await.unwrap();
    assert_eq!(load.phase, Phase::Load);
    assert_eq!(load.tally.writes, 20);
    assert_eq!(
        store.history().iter().map(|w| w.key).collect::<Vec<_>>(),
        (100..120).collect::<Vec<_>>()
    );
    assert_eq!(store.len(), 20);
    assert!(!dir.path().join("latency.json").exists());

    let run = benchmark.run().await.unwrap();
    assert_eq!(run.phase, Phase::Run);
    assert_eq!(run.tally.submitted, 10);
    assert_eq!(benchmark.next_sequence(), 30);
    // Run writes pick up where the load left off.
    assert!(store.history()[20..].iter().all(|w| w.sequence >= 20));
    assert_eq!((store.inits(), store.stops()), (2, 2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(10_000)]
async fn concurrent_load_covers_key_space() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let mut benchmark = Benchmark::with_shared(
        Arc::clone(&store),
        BenchmarkConfig {
            keys: 500,
            concurrency: 16,
            ..config(&dir, "order", 0)
        },
    );
    benchmark.load().await.unwrap();

    let mut keys: Vec<_> = store.history().iter().map(|w| w.key).collect();
    keys.sort_unstable();
    assert_eq!(keys, (0..500).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(10_000)]
async fn write_ratio_splits_operations() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let mut benchmark = Benchmark::with_shared(
        Arc::clone(&store),
        BenchmarkConfig {
            write_ratio: 0.5,
            concurrency: 4,
            ..config(&dir, "uniform", 2_000)
        },
    );
    let report = benchmark.run().await.unwrap();

    assert_eq!(report.tally.writes + report.tally.reads, 2_000);
    assert!((850..1_150).contains(&report.tally.writes), "{:?}", report.tally);
    assert_eq!(store.history().len() as u64, report.tally.writes);
    // Reads contribute zero-length samples.
    assert_eq!(benchmark.latency().len(), 2_000);
    assert_eq!(
        benchmark.latency().iter().filter(|l| l.is_zero()).count() as u64,
        report.tally.reads
    );
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn linearizability_result_is_reported() {
    init();
    let dir = tempfile::tempdir().unwrap();

    let mut benchmark = Benchmark::new(
        MemoryStore::new().with_checker(),
        BenchmarkConfig {
            linearizability_check: true,
            ..config(&dir, "zipfian", 100)
        },
    );
    let report = benchmark.run().await.unwrap();
    assert_eq!(report.anomalies, Some(0));

    let json = std::fs::read_to_string(dir.path().join("latency.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(json["anomalies"], 0);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn samples_are_dumped_sorted() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let samples = dir.path().join("samples.txt");

    let mut benchmark = Benchmark::new(
        MemoryStore::new().latency(mock_store::Latency::Normal {
            mean: Duration::from_millis(2),
            std_dev: Duration::from_millis(1),
        }),
        BenchmarkConfig {
            samples_path: Some(samples.clone()),
            concurrency: 8,
            ..config(&dir, "exponential", 64)
        },
    );
    benchmark.run().await.unwrap();

    let values: Vec<f64> = std::fs::read_to_string(&samples)
        .unwrap()
        .lines()
        .map(|line| line.parse().unwrap())
        .collect();
    assert_eq!(values.len(), 64);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn unknown_distribution_never_touches_store() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let mut benchmark =
        Benchmark::with_shared(Arc::clone(&store), config(&dir, "triangular", 10));
    let err = benchmark.run().await.unwrap_err();

    assert!(err.is_config());
    assert_eq!(store.inits(), 0);
    assert!(!dir.path().join("latency.json").exists());
}
