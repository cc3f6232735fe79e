mod utils;
#[allow(unused)]
use utils::*;

use kvbench::prelude::*;
use mock_store::{Latency, MemoryStore};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(10_000)]
async fn timed_run_drains_in_flight_writes() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new().latency(Latency::Fixed(Duration::from_millis(5))));

    let mut benchmark = Benchmark::with_shared(
        Arc::clone(&store),
        BenchmarkConfig {
            duration: Some(Duration::from_secs(1)),
            throttle: 200,
            concurrency: 4,
            ..config(&dir, "uniform", 0)
        },
    );

    let start = Instant::now();
    let report = benchmark.run().await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(report.elapsed >= Duration::from_secs(1));
    assert!(
        (180..=202).contains(&report.tally.submitted),
        "{:?}",
        report.tally
    );
    // Nothing submitted before the deadline is lost.
    assert_eq!(store.history().len() as u64, report.tally.submitted);
    assert!(report.statistics.min >= Duration::from_millis(5));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn throttle_spaces_requests() {
    init();
    let dir = tempfile::tempdir().unwrap();

    let mut benchmark = Benchmark::new(
        MemoryStore::new(),
        BenchmarkConfig {
            throttle: 100,
            ..config(&dir, "order", 21)
        },
    );

    let start = Instant::now();
    let report = benchmark.run().await.unwrap();

    // The first key is free, the other twenty wait 10ms each.
    assert!(start.elapsed() >= Duration::from_millis(190));
    assert_eq!(report.tally.writes, 21);
    assert!(report.throughput <= 110., "{}", report.throughput);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn moving_mean_drifts_hot_spot() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());

    let mut benchmark = Benchmark::with_shared(
        Arc::clone(&store),
        BenchmarkConfig {
            duration: Some(Duration::from_secs(1)),
            keys: 100,
            mu: 10.,
            sigma: 1.,
            moving_mean: true,
            speed: Duration::from_millis(20),
            throttle: 200,
            ..config(&dir, "normal", 0)
        },
    );
    benchmark.run().await.unwrap();

    let keys: Vec<f64> = store.history().iter().map(|w| w.key as f64).collect();
    assert!(keys.len() > 100);
    let head = keys[..20].iter().sum::<f64>() / 20.;
    let tail = keys[keys.len() - 20..].iter().sum::<f64>() / 20.;
    assert!(head < 20., "{head}");
    assert!(tail > 35., "{tail}");
}
