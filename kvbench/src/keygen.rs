//! Distribution-driven key generation.
mod zipf;

use crate::limiter::RateLimiter;
use arc_swap::ArcSwap;
use kvbench_core::{BenchmarkConfig, ConfigError, DistributionKind, Key};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp1, Normal};
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

pub use zipf::{Zipf, ZipfError};

/// Produces the next key of a run according to the configured distribution.
///
/// Owns its own RNG, seeded from [`BenchmarkConfig::seed`] when present, and the optional
/// rate limiter pacing key production.
#[derive(Debug)]
pub struct KeyGenerator {
    kind: DistributionKind,
    sampler: Sampler,
    keys: u64,
    min: u64,
    cursor: u64,
    rng: SmallRng,
    limiter: RateLimiter,
}

#[derive(Debug)]
enum Sampler {
    Order,
    Uniform,
    Conflict { percent: u32 },
    Normal(Arc<ArcSwap<Normal<f64>>>),
    Zipfian(Zipf),
    Exponential { lambda: f64 },
}

impl KeyGenerator {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, ConfigError> {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: &BenchmarkConfig, rng: SmallRng) -> Result<Self, ConfigError> {
        let kind = config.validate()?;

        let sampler = match kind {
            DistributionKind::Order => Sampler::Order,
            DistributionKind::Uniform => Sampler::Uniform,
            DistributionKind::Conflict => Sampler::Conflict {
                percent: config.conflicts,
            },
            DistributionKind::Normal => {
                let normal = Normal::new(config.mu, config.sigma).map_err(|_| {
                    ConfigError::Invalid {
                        field: "sigma",
                        reason: "must be finite and non-negative",
                    }
                })?;
                Sampler::Normal(Arc::new(ArcSwap::from_pointee(normal)))
            }
            DistributionKind::Zipfian => {
                let zipf = Zipf::new(config.zipfian_s, config.zipfian_v, config.keys).map_err(
                    |err| match err {
                        ZipfError::Exponent => ConfigError::Invalid {
                            field: "zipfian_s",
                            reason: "must be greater than 1",
                        },
                        ZipfError::Offset => ConfigError::Invalid {
                            field: "zipfian_v",
                            reason: "must be at least 1",
                        },
                    },
                )?;
                Sampler::Zipfian(zipf)
            }
            DistributionKind::Exponential => Sampler::Exponential {
                lambda: config.lambda,
            },
        };

        Ok(Self {
            kind,
            sampler,
            keys: config.keys,
            min: config.min_key,
            cursor: 0,
            rng,
            limiter: RateLimiter::new(config.throttle),
        })
    }

    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    /// Handle for drifting the mean of a `normal` generator while it is in use.
    pub fn mean_shift(&self) -> Option<MeanShift> {
        match &self.sampler {
            Sampler::Normal(normal) => Some(MeanShift {
                normal: Arc::clone(normal),
                keys: self.keys,
            }),
            _ => None,
        }
    }

    /// The next key, after waiting on the rate limiter if one is configured.
    pub async fn next(&mut self) -> Key {
        let key = self.sample();
        self.limiter.wait().await;
        key
    }

    /// The next key without pacing.
    pub fn sample(&mut self) -> Key {
        match &self.sampler {
            Sampler::Order => next_in_order(&mut self.cursor, self.keys, self.min),
            Sampler::Uniform => self.rng.gen_range(0..self.keys) + self.min,
            Sampler::Conflict { percent } => {
                if self.rng.gen_range(0..100) < *percent {
                    0
                } else {
                    next_in_order(&mut self.cursor, self.keys, self.min)
                }
            }
            Sampler::Normal(normal) => {
                let draw: f64 = normal.load().sample(&mut self.rng);
                fold(draw as i64, self.keys as i64) as Key
            }
            Sampler::Zipfian(zipf) => zipf.sample(&mut self.rng),
            Sampler::Exponential { lambda } => {
                let draw: f64 = Exp1.sample(&mut self.rng);
                (draw / lambda) as Key
            }
        }
    }
}

fn next_in_order(cursor: &mut u64, keys: u64, min: u64) -> Key {
    let key = *cursor + min;
    *cursor = (*cursor + 1) % keys;
    key
}

/// Folds `key` into `[0, keys]` one key space at a time.
///
/// Not a modulo: `keys` itself stays in range and far outliers take one step per wrap.
fn fold(mut key: i64, keys: i64) -> i64 {
    while key < 0 {
        key += keys;
    }
    while key > keys {
        key -= keys;
    }
    key
}

/// Shared handle on the mean of a `normal` [`KeyGenerator`].
#[derive(Debug, Clone)]
pub struct MeanShift {
    normal: Arc<ArcSwap<Normal<f64>>>,
    keys: u64,
}

impl MeanShift {
    pub fn mean(&self) -> f64 {
        self.normal.load().mean()
    }

    /// Moves the mean one key forward, wrapping at the end of the key space.
    pub fn advance(&self) {
        let current = self.normal.load();
        let mean = ((current.mean() + 1.) as i64 % self.keys as i64) as f64;
        match Normal::new(mean, current.std_dev()) {
            Ok(normal) => {
                trace!("Moving mean to {mean}");
                self.normal.store(Arc::new(normal));
            }
            Err(err) => error!("Unable to move mean to {mean}: {err}"),
        }
    }
}
