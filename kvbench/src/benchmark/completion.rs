use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

/// Counting barrier between submitted and resolved operations.
///
/// The orchestrator adds one before every submission, the collector marks one done per
/// outcome, and [`Completion::wait`] returns once both sides agree.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    pending: AtomicU64,
    notify: Notify,
}

impl Completion {
    pub fn add(&self, count: u64) {
        self.pending.fetch_add(count, Ordering::AcqRel);
    }

    pub fn done(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "more operations resolved than submitted");
        if previous == 1 {
            self.notify.notify_waiters();
        }
    }

    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a `done()` in between is not missed.
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}
