use serde::Serialize;
use serde_with::{serde_as, DurationMilliSecondsWithFrac};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Summary of every latency sample collected during one phase.
///
/// Computed once from the collector's sequence. An empty sequence yields all-zero statistics.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub mean: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub std_dev: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub min: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub max: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p50: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p90: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p95: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p99: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p999: Duration,
}

impl Statistics {
    pub fn from_latencies(latencies: &[Duration]) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_unstable();

        let secs: Vec<f64> = sorted.iter().map(Duration::as_secs_f64).collect();
        let mean = statistical::mean(&secs);
        // NOTE: `statistical` divides by n - 1 and needs at least two samples.
        let std_dev = if secs.len() > 1 {
            statistical::standard_deviation(&secs, Some(mean))
        } else {
            0.
        };

        Self {
            count: sorted.len(),
            mean: Duration::from_secs_f64(mean),
            std_dev: Duration::from_secs_f64(std_dev),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p50: quantile(&sorted, 0.5),
            p90: quantile(&sorted, 0.9),
            p95: quantile(&sorted, 0.95),
            p99: quantile(&sorted, 0.99),
            p999: quantile(&sorted, 0.999),
        }
    }
}

/// `sorted[floor(q * n)]`, clamped to the last sample.
fn quantile(sorted: &[Duration], q: f64) -> Duration {
    let idx = (q * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Writes the latencies in ascending order, one per line, in milliseconds.
pub fn write_samples(path: impl AsRef<Path>, latencies: &[Duration]) -> io::Result<()> {
    let mut sorted = latencies.to_vec();
    sorted.sort_unstable();

    let mut out = BufWriter::new(File::create(path)?);
    for latency in sorted {
        writeln!(out, "{}", latency.as_nanos() as f64 / 1e6)?;
    }
    out.flush()
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count={}, mean={:?}, stddev={:?}, min={:?}, max={:?}, p50={:?}, p90={:?}, p95={:?}, p99={:?}, p99.9={:?}",
            self.count,
            self.mean,
            self.std_dev,
            self.min,
            self.max,
            self.p50,
            self.p90,
            self.p95,
            self.p99,
            self.p999,
        )
    }
}
