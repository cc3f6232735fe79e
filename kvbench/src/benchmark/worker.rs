use super::collector::Outcome;
use super::completion::Completion;
use kvbench_core::{Db, Job, Operation};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::Sender;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// One member of the fixed worker pool.
pub(crate) struct Worker<D> {
    pub id: usize,
    pub db: Arc<D>,
    pub write_ratio: f64,
    pub payload_size: usize,
    /// Start of the phase; operation timestamps are relative to it.
    pub origin: Instant,
    pub rng: SmallRng,
    pub completion: Arc<Completion>,
    /// Payload of this worker's most recent successful write.
    pub last_value: Option<Vec<u8>>,
}

impl<D> Worker<D>
where
    D: Db + Sync + 'static,
{
    pub async fn run(mut self, jobs: async_channel::Receiver<Job>, outcomes: Sender<Outcome>) {
        trace!("Worker {} started", self.id);
        while let Ok(job) = jobs.recv().await {
            let outcome = self.execute(job).await;
            if outcomes.send(outcome).await.is_err() {
                // Keep the barrier honest even though nobody will record this outcome.
                error!("Collector hung up before worker {} finished.", self.id);
                self.completion.done();
                break;
            }
        }
        trace!("Worker {} finished", self.id);
    }

    async fn execute(&mut self, job: Job) -> Outcome {
        let op = self.perform(job).await;
        let outcome = Outcome::of(&op);

        #[cfg(feature = "metrics")]
        match outcome {
            Outcome::Write(latency) => {
                metrics::histogram!("kvbench_write_latency").record(latency.as_secs_f64());
                metrics::counter!("kvbench_write_success").increment(1);
            }
            Outcome::Failed => metrics::counter!("kvbench_write_error").increment(1),
            Outcome::Read => {}
        }

        trace!(
            key = job.key,
            sequence = job.sequence,
            start = ?op.start,
            end = ?op.end,
            "Operation resolved"
        );
        outcome
    }

    /// Writes with probability `write_ratio`, otherwise records a read placeholder returning
    /// the last value this worker wrote.
    async fn perform(&mut self, job: Job) -> Operation {
        let mut op = Operation::default();

        if self.rng.gen::<f64>() < self.write_ratio {
            let mut value = vec![0u8; self.payload_size];
            self.rng.fill_bytes(&mut value);

            let start = Instant::now();
            let res = self.db.write(job.key, &value, job.sequence).await;
            let end = Instant::now();

            op.start = start - self.origin;
            match res {
                Ok(()) => {
                    op.end = Some(end - self.origin);
                    self.last_value = Some(value.clone());
                }
                Err(err) => error!(
                    key = job.key,
                    sequence = job.sequence,
                    "Write failed: {err}"
                ),
            }
            op.input = Some(value);
        } else {
            let now = Instant::now() - self.origin;
            op.start = now;
            op.end = Some(now);
            op.output = self.last_value.clone();
        }

        op
    }
}
