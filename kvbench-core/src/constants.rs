use std::time::Duration;

/// Capacity of the queue carrying finished operations to the collector.
pub const LATENCY_QUEUE_CAPACITY: usize = 1000;

/// First sequence number handed out by a fresh benchmark.
pub const SEQUENCE_ORIGIN: u64 = 0;

pub const DEFAULT_DURATION: Duration = Duration::from_secs(60);
pub const DEFAULT_KEYS: u64 = 1000;
pub const DEFAULT_CONFLICTS: u32 = 100;
pub const DEFAULT_SIGMA: f64 = 60.;
pub const DEFAULT_MOVE_SPEED: Duration = Duration::from_millis(500);
pub const DEFAULT_ZIPFIAN_S: f64 = 2.;
pub const DEFAULT_ZIPFIAN_V: f64 = 1.;
pub const DEFAULT_LAMBDA: f64 = 0.01;
pub const DEFAULT_PAYLOAD_SIZE: usize = 128;
pub const DEFAULT_REPORT_PATH: &str = "latency.json";
