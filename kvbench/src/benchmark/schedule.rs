use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Background task calling a closure once per period until cancelled.
///
/// The first call happens one full period after creation. Dropping the schedule aborts the
/// task; [`Schedule::cancel`] stops it and waits for it to exit.
pub(crate) struct Schedule {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Schedule {
    pub fn every<F>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // NOTE: First tick completes instantly
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => task(),
                    _ = stopped.changed() => break,
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub async fn cancel(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                error!("Scheduled task failed: {err}");
            }
        }
    }
}

impl Drop for Schedule {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
