//! In-memory key-value target for exercising the benchmark without a real cluster.
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use kvbench_core::{Db, Key};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("injected failure writing key {key} (sequence {sequence})")]
    Injected { key: Key, sequence: u64 },

    #[error("store is over its {0} writes per second budget")]
    Overloaded(u32),
}

/// Simulated service time of a single write.
#[derive(Debug, Clone, Copy, Default)]
pub enum Latency {
    #[default]
    None,
    Fixed(Duration),
    /// Normally distributed, clamped at zero.
    Normal { mean: Duration, std_dev: Duration },
}

/// A write as the store applied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub key: Key,
    pub sequence: u64,
}

/// Thread-safe in-memory [`Db`] with injectable latency and failures.
///
/// Every applied write lands in a history which the store's linearizability checker scans for
/// keys whose sequence numbers went backwards.
pub struct MemoryStore {
    data: Mutex<HashMap<Key, Vec<u8>>>,
    history: Mutex<Vec<Applied>>,
    rng: Mutex<SmallRng>,
    latency: Latency,
    fail_ratio: f64,
    limiter: Option<(u32, DefaultDirectRateLimiter)>,
    checker: bool,
    inits: AtomicU64,
    stops: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            history: Mutex::new(vec![]),
            rng: Mutex::new(SmallRng::from_entropy()),
            latency: Latency::None,
            fail_ratio: 0.,
            limiter: None,
            checker: false,
            inits: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        }
    }

    pub fn latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    /// Fraction of writes rejected with [`StoreError::Injected`]. `1.0` fails every write.
    pub fn fail_ratio(mut self, ratio: f64) -> Self {
        self.fail_ratio = ratio.clamp(0., 1.);
        self
    }

    /// Rejects writes beyond `tps` per second with [`StoreError::Overloaded`].
    pub fn max_tps(mut self, tps: u32) -> Self {
        self.limiter =
            NonZeroU32::new(tps).map(|rate| (tps, RateLimiter::direct(Quota::per_second(rate))));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(SmallRng::seed_from_u64(seed));
        self
    }

    /// Enables the history-based linearizability checker.
    pub fn with_checker(mut self) -> Self {
        self.checker = true;
        self
    }

    pub fn get(&self, key: Key) -> Option<Vec<u8>> {
        lock(&self.data).get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.data).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applied writes in the order the store saw them.
    pub fn history(&self) -> Vec<Applied> {
        lock(&self.history).clone()
    }

    pub fn inits(&self) -> u64 {
        self.inits.load(Ordering::Relaxed)
    }

    pub fn stops(&self) -> u64 {
        self.stops.load(Ordering::Relaxed)
    }

    fn service_time(&self) -> (Duration, bool) {
        let mut rng = lock(&self.rng);
        let fail = self.fail_ratio > 0. && rng.gen::<f64>() < self.fail_ratio;
        let delay = match self.latency {
            Latency::None => Duration::ZERO,
            Latency::Fixed(delay) => delay,
            Latency::Normal { mean, std_dev } => {
                match Normal::new(mean.as_secs_f64(), std_dev.as_secs_f64()) {
                    Ok(normal) => Duration::from_secs_f64(normal.sample(&mut *rng).max(0.)),
                    Err(_) => mean,
                }
            }
        };
        (delay, fail)
    }
}

impl Db for MemoryStore {
    type Error = StoreError;

    async fn init(&self) -> Result<(), Self::Error> {
        let count = self.inits.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Store initialized ({count})");
        Ok(())
    }

    async fn write(&self, key: Key, value: &[u8], sequence: u64) -> Result<(), Self::Error> {
        let (delay, fail) = self.service_time();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some((tps, limiter)) = &self.limiter {
            if limiter.check().is_err() {
                return Err(StoreError::Overloaded(*tps));
            }
        }
        if fail {
            return Err(StoreError::Injected { key, sequence });
        }

        trace!(key, sequence, "Applying write");
        lock(&self.data).insert(key, value.to_vec());
        lock(&self.history).push(Applied { key, sequence });
        Ok(())
    }

    async fn stop(&self) -> Result<(), Self::Error> {
        let count = self.stops.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Store stopped ({count})");
        Ok(())
    }

    fn check_linearizability(&self) -> Result<Option<u64>, Self::Error> {
        if !self.checker {
            return Ok(None);
        }

        let mut latest: HashMap<Key, u64> = HashMap::new();
        let mut anomalies = 0;
        for applied in lock(&self.history).iter() {
            match latest.get_mut(&applied.key) {
                Some(seen) if *seen > applied.sequence => anomalies += 1,
                Some(seen) => *seen = applied.sequence,
                None => {
                    latest.insert(applied.key, applied.sequence);
                }
            }
        }
        Ok(Some(anomalies))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
