use super::completion::Completion;
use kvbench_core::Operation;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// How a single submitted key was resolved by its worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Outcome {
    Write(Duration),
    /// Read placeholder; start and end coincide.
    Read,
    Failed,
}

impl Outcome {
    /// Writes carry an input; only completed ones have a latency.
    pub fn of(op: &Operation) -> Self {
        match (op.input.is_some(), op.latency()) {
            (false, _) => Self::Read,
            (true, Some(latency)) => Self::Write(latency),
            (true, None) => Self::Failed,
        }
    }
}

/// Everything the collector accumulated over one phase.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub latency: Vec<Duration>,
    pub writes: u64,
    pub reads: u64,
    pub failures: u64,
}

/// Sole consumer of worker outcomes.
///
/// Appends one latency per completed operation and releases one unit of the completion
/// barrier per outcome, failed or not. Returns once every sender has hung up.
pub(crate) async fn collect(
    mut outcomes: Receiver<Outcome>,
    completion: Arc<Completion>,
) -> Collected {
    let mut collected = Collected::default();
    while let Some(outcome) = outcomes.recv().await {
        match outcome {
            Outcome::Write(latency) => {
                collected.writes += 1;
                collected.latency.push(latency);
            }
            Outcome::Read => {
                collected.reads += 1;
                collected.latency.push(Duration::ZERO);
            }
            Outcome::Failed => collected.failures += 1,
        }
        completion.done();
    }

    trace!("Collected {} latencies", collected.latency.len());
    collected
}
