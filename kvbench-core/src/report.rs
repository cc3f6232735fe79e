use crate::stats::Statistics;
use serde::Serialize;
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Load,
    Run,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Load => f.write_str("load"),
            Phase::Run => f.write_str("run"),
        }
    }
}

/// Per-outcome counts of one phase.
///
/// `submitted == writes + reads + failures` once the phase has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub submitted: u64,
    pub writes: u64,
    pub reads: u64,
    pub failures: u64,
}

impl Tally {
    pub fn resolved(&self) -> u64 {
        self.writes + self.reads + self.failures
    }

    pub fn error_rate(&self) -> f64 {
        if self.submitted == 0 {
            0.
        } else {
            self.failures as f64 / self.submitted as f64
        }
    }
}

/// Everything known about a finished phase.
#[serde_as]
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub phase: Phase,
    pub distribution: String,
    pub concurrency: usize,
    pub write_ratio: f64,
    pub keys: u64,
    pub tally: Tally,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub elapsed: Duration,
    /// Completed operations per second of wall-clock time.
    pub throughput: f64,
    pub statistics: Statistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomalies: Option<u64>,
}

impl Report {
    pub fn throughput(completed: usize, elapsed: Duration) -> f64 {
        if elapsed.is_zero() {
            0.
        } else {
            completed as f64 / elapsed.as_secs_f64()
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self)?;
        writeln!(out)?;
        out.flush()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} submitted, {} failed, {:.2} ops/s over {:?}; {}",
            self.phase,
            self.distribution,
            self.tally.submitted,
            self.tally.failures,
            self.throughput,
            self.elapsed,
            self.statistics,
        )
    }
}
