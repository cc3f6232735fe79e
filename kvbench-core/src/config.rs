use crate::constants::*;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown distribution `{0}`")]
    UnknownDistribution(String),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Key distribution selected by [`BenchmarkConfig::distribution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    /// Cyclic counter over the key space.
    Order,
    Uniform,
    /// A hot key (`0`) hit with probability `conflicts / 100`, otherwise `Order`.
    Conflict,
    /// Normal around `mu`, folded back into `[0, K]`.
    Normal,
    Zipfian,
    Exponential,
}

impl DistributionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Uniform => "uniform",
            Self::Conflict => "conflict",
            Self::Normal => "normal",
            Self::Zipfian => "zipfian",
            Self::Exponential => "exponential",
        }
    }
}

impl FromStr for DistributionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(Self::Order),
            "uniform" => Ok(Self::Uniform),
            "conflict" => Ok(Self::Conflict),
            "normal" => Ok(Self::Normal),
            // `zipfan` is the spelling older config files use.
            "zipfian" | "zipfan" => Ok(Self::Zipfian),
            "exponential" => Ok(Self::Exponential),
            other => Err(ConfigError::UnknownDistribution(other.to_string())),
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What ends the measured phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    Duration(Duration),
    Requests(u64),
}

/// Every knob of a benchmark run.
///
/// Read once when a phase starts and never mutated by the engine. Missing fields in a config
/// file fall back to [`BenchmarkConfig::default`].
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Length of the measured phase. Takes precedence over `requests` when non-zero.
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub duration: Option<Duration>,
    /// Number of requests issued when no duration is configured.
    pub requests: u64,
    /// Size of the key space, `K`.
    pub keys: u64,
    /// Offset added to `order`, `uniform` and `conflict` keys.
    pub min_key: u64,
    /// Fraction of operations that are writes; the rest are read placeholders.
    pub write_ratio: f64,
    /// Keys generated per second, `0` disables throttling.
    pub throttle: u32,
    /// Number of workers issuing operations.
    pub concurrency: usize,
    pub distribution: String,
    pub linearizability_check: bool,

    /// Percentage of keys that hit the hot key in `conflict` mode.
    pub conflicts: u32,

    pub mu: f64,
    pub sigma: f64,
    /// Drift `mu` by one key every `speed`.
    pub moving_mean: bool,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub speed: Duration,

    pub zipfian_s: f64,
    pub zipfian_v: f64,

    pub lambda: f64,

    /// Payload size of each write, in bytes.
    pub payload_size: usize,

    /// Seed for key generation and payloads. Entropy is used when unset.
    pub seed: Option<u64>,
    /// Where the run report is written.
    pub report_path: PathBuf,
    /// Where the sorted latency samples are written, if anywhere.
    pub samples_path: Option<PathBuf>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            duration: Some(DEFAULT_DURATION),
            requests: 0,
            keys: DEFAULT_KEYS,
            min_key: 0,
            write_ratio: 1.,
            throttle: 0,
            concurrency: 1,
            distribution: DistributionKind::Uniform.to_string(),
            linearizability_check: false,
            conflicts: DEFAULT_CONFLICTS,
            mu: 0.,
            sigma: DEFAULT_SIGMA,
            moving_mean: false,
            speed: DEFAULT_MOVE_SPEED,
            zipfian_s: DEFAULT_ZIPFIAN_S,
            zipfian_v: DEFAULT_ZIPFIAN_V,
            lambda: DEFAULT_LAMBDA,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            seed: None,
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            samples_path: None,
        }
    }
}

impl BenchmarkConfig {
    /// Reads a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn distribution_kind(&self) -> Result<DistributionKind, ConfigError> {
        self.distribution.parse()
    }

    pub fn cutoff(&self) -> Cutoff {
        match self.duration {
            Some(duration) if !duration.is_zero() => Cutoff::Duration(duration),
            _ => Cutoff::Requests(self.requests),
        }
    }

    /// Checks the parameters of the selected distribution and the run shape.
    pub fn validate(&self) -> Result<DistributionKind, ConfigError> {
        let kind = self.distribution_kind()?;
        self.validate_shape()?;

        if self.moving_mean && self.speed.is_zero() {
            return Err(invalid("speed", "must be positive when the mean moves"));
        }

        match kind {
            DistributionKind::Conflict if self.conflicts > 100 => {
                Err(invalid("conflicts", "must be a percentage"))
            }
            DistributionKind::Normal if self.keys > i64::MAX as u64 => {
                Err(invalid("keys", "too large to fold a normal draw into"))
            }
            DistributionKind::Normal if !(self.sigma.is_finite() && self.sigma >= 0.) => {
                Err(invalid("sigma", "must be finite and non-negative"))
            }
            DistributionKind::Normal if !self.mu.is_finite() => {
                Err(invalid("mu", "must be finite"))
            }
            DistributionKind::Zipfian if !(self.zipfian_s > 1.) => {
                Err(invalid("zipfian_s", "must be greater than 1"))
            }
            DistributionKind::Zipfian if !(self.zipfian_v >= 1.) => {
                Err(invalid("zipfian_v", "must be at least 1"))
            }
            DistributionKind::Exponential if !(self.lambda > 0. && self.lambda.is_finite()) => {
                Err(invalid("lambda", "must be positive"))
            }
            _ => Ok(kind),
        }
    }

    /// Checks the key space and worker settings, ignoring the distribution.
    ///
    /// Enough for the Load phase, which never draws from the distribution.
    pub fn validate_shape(&self) -> Result<(), ConfigError> {
        if self.keys == 0 {
            return Err(invalid("keys", "key space must not be empty"));
        }
        if self.min_key.checked_add(self.keys).is_none() {
            return Err(invalid("keys", "min_key + keys overflows the key type"));
        }
        if self.concurrency == 0 {
            return Err(invalid("concurrency", "at least one worker is required"));
        }
        if !(0. ..=1.).contains(&self.write_ratio) {
            return Err(invalid("write_ratio", "must be within [0, 1]"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
