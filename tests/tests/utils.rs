use kvbench::BenchmarkConfig;
use std::sync::OnceLock;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        // Another harness may already own the global subscriber.
        let _ = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("kvbench=debug,mock_store=debug")
            .try_init();
    });
}

/// Count-based config writing its report into `dir`.
#[allow(unused)]
pub fn config(dir: &tempfile::TempDir, distribution: &str, requests: u64) -> BenchmarkConfig {
    BenchmarkConfig {
        duration: None,
        requests,
        distribution: distribution.to_string(),
        seed: Some(1),
        report_path: dir.path().join("latency.json"),
        ..Default::default()
    }
}
