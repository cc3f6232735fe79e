use governor::{DefaultDirectRateLimiter, Quota};
use std::fmt;
use std::num::NonZeroU32;

/// Steady-interval pacer for key generation.
///
/// Burst is fixed at one so consecutive calls to [`RateLimiter::wait`] are spaced `1 / rate`
/// apart instead of draining a saved-up bucket. A rate of zero disables pacing.
pub struct RateLimiter {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    pub fn new(rate: u32) -> Self {
        Self {
            limiter: NonZeroU32::new(rate).map(rate_limiter),
        }
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Waits until the next slot is available.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limited", &self.is_limited())
            .finish()
    }
}

fn rate_limiter(rate: NonZeroU32) -> DefaultDirectRateLimiter {
    governor::RateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN))
}
