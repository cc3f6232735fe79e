//! Run lifecycle: the priming Load phase and the measured Run phase.
mod collector;
mod completion;
mod schedule;
mod worker;

use crate::error::BenchmarkError;
use crate::keygen::KeyGenerator;
use collector::Collected;
use completion::Completion;
use kvbench_core::{
    write_samples, BenchmarkConfig, Cutoff, Db, Job, Key, Phase, Report, Statistics, Tally,
    LATENCY_QUEUE_CAPACITY, SEQUENCE_ORIGIN,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use schedule::Schedule;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use worker::Worker;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Drives generated load against a [`Db`] and measures it.
///
/// Sequence numbers start at zero for a new benchmark and keep increasing across every phase
/// it runs, so a Load followed by a Run never hands the target the same number twice.
///
/// # Example
/// ```no_run
/// use kvbench::prelude::*;
/// # async fn example(db: impl Db + Sync + 'static) -> Result<(), BenchmarkError> {
/// let config = BenchmarkConfig {
///     distribution: "zipfian".to_string(),
///     concurrency: 16,
///     ..Default::default()
/// };
///
/// let mut benchmark = Benchmark::new(db, config);
/// benchmark.load().await?;
/// let report = benchmark.run().await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
pub struct Benchmark<D> {
    db: Arc<D>,
    config: BenchmarkConfig,
    sequence: u64,
    latency: Vec<Duration>,
    seeder: SmallRng,
}

impl<D> Benchmark<D>
where
    D: Db + Sync + 'static,
{
    pub fn new(db: D, config: BenchmarkConfig) -> Self {
        Self::with_shared(Arc::new(db), config)
    }

    /// Benchmark a target the caller keeps a handle to.
    pub fn with_shared(db: Arc<D>, config: BenchmarkConfig) -> Self {
        // Worker RNGs are derived from a stream independent of the key generator's.
        let seeder = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.rotate_left(32) ^ 0x9e37_79b9_7f4a_7c15),
            None => SmallRng::from_entropy(),
        };

        Self {
            db,
            config,
            sequence: SEQUENCE_ORIGIN,
            latency: vec![],
            seeder,
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn db(&self) -> &Arc<D> {
        &self.db
    }

    /// The sequence number the next generated key will carry.
    pub fn next_sequence(&self) -> u64 {
        self.sequence
    }

    /// Latency samples of the most recent phase, in the order the collector received them.
    pub fn latency(&self) -> &[Duration] {
        &self.latency
    }

    /// Writes every key of `[min_key, min_key + keys)` once, in order.
    ///
    /// Forces a write ratio of one and ignores the throttle and distribution. Nothing is
    /// persisted.
    #[instrument(name = "load", skip_all, fields(keys = self.config.keys))]
    pub async fn load(&mut self) -> Result<Report, BenchmarkError> {
        let config = BenchmarkConfig {
            write_ratio: 1.,
            throttle: 0,
            ..self.config.clone()
        };
        config.validate_shape()?;

        self.db
            .init()
            .await
            .map_err(|err| BenchmarkError::Init(Box::new(err)))?;

        let start = Instant::now();
        let mut pipeline = self.pipeline(&config, start);
        let mut submission = Ok(());
        for key in config.min_key..config.min_key + config.keys {
            let job = self.assign(key);
            submission = pipeline.submit(job).await;
            if submission.is_err() {
                break;
            }
        }
        let submitted = start.elapsed();

        self.stop_target().await;
        submission?;
        let (tally, collected) = pipeline.drain().await?;
        let elapsed = start.elapsed();

        let report = self.finish(Phase::Load, &config, tally, collected, elapsed);
        info!("Benchmark took {}", humantime::format_duration(elapsed));
        debug!(
            "Submission finished after {}",
            humantime::format_duration(submitted)
        );
        info!("Throughput {:.2}", report.throughput);
        info!("{}", report.statistics);

        Ok(report)
    }

    /// Runs the measured phase until the configured duration or request count is reached,
    /// waits for every submitted operation, then persists the report.
    #[instrument(name = "run", skip_all, fields(distribution = %self.config.distribution))]
    pub async fn run(&mut self) -> Result<Report, BenchmarkError> {
        let config = self.config.clone();
        let mut keygen = KeyGenerator::new(&config)?;

        let mover = if config.moving_mean {
            match keygen.mean_shift() {
                Some(shift) => {
                    debug!("Moving mean every {}", humantime::format_duration(config.speed));
                    Some(Schedule::every(config.speed, move || shift.advance()))
                }
                None => {
                    warn!("Moving mean only applies to the normal distribution; ignoring.");
                    None
                }
            }
        } else {
            None
        };

        self.db
            .init()
            .await
            .map_err(|err| BenchmarkError::Init(Box::new(err)))?;

        let start = Instant::now();
        let mut pipeline = self.pipeline(&config, start);

        let submission = self.submit_until(config.cutoff(), &mut keygen, &mut pipeline).await;
        debug!("Submission finished after {} keys", pipeline.submitted);

        // The target is released even when the worker queue broke down.
        self.stop_target().await;
        submission?;
        let (tally, collected) = pipeline.drain().await?;
        let elapsed = start.elapsed();

        if let Some(mover) = mover {
            mover.cancel().await;
        }

        let mut report = self.finish(Phase::Run, &config, tally, collected, elapsed);
        if config.linearizability_check {
            report.anomalies = self.check()?;
        }

        info!("Concurrency = {}", config.concurrency);
        info!("Write Ratio = {}", config.write_ratio);
        info!("Number of Keys = {}", config.keys);
        info!("Benchmark Time = {}", humantime::format_duration(elapsed));
        info!("Throughput = {:.2}", report.throughput);
        info!("{}", report.statistics);
        if report.tally.failures > 0 {
            warn!(
                "{} of {} operations failed",
                report.tally.failures, report.tally.submitted
            );
        }

        report.write_json(&config.report_path)?;
        if let Some(path) = &config.samples_path {
            write_samples(path, &self.latency)?;
        }

        Ok(report)
    }

    async fn submit_until(
        &mut self,
        cutoff: Cutoff,
        keygen: &mut KeyGenerator,
        pipeline: &mut Pipeline,
    ) -> Result<(), BenchmarkError> {
        match cutoff {
            Cutoff::Duration(duration) => {
                let deadline = tokio::time::sleep(duration);
                tokio::pin!(deadline);

                loop {
                    let key = tokio::select! {
                        biased;
                        _ = &mut deadline => break,
                        key = keygen.next() => key,
                    };
                    let job = self.assign(key);
                    pipeline.submit(job).await?;
                }
            }
            Cutoff::Requests(requests) => {
                for _ in 0..requests {
                    let key = keygen.next().await;
                    let job = self.assign(key);
                    pipeline.submit(job).await?;
                }
            }
        }
        Ok(())
    }

    fn assign(&mut self, key: Key) -> Job {
        let job = Job {
            key,
            sequence: self.sequence,
        };
        self.sequence += 1;
        job
    }

    fn pipeline(&mut self, config: &BenchmarkConfig, origin: Instant) -> Pipeline {
        let completion = Arc::new(Completion::default());
        let (jobs_tx, jobs_rx) = async_channel::bounded(config.concurrency);
        let (outcomes_tx, outcomes_rx) = mpsc::channel(LATENCY_QUEUE_CAPACITY);

        let collector = tokio::spawn(
            collector::collect(outcomes_rx, Arc::clone(&completion)).in_current_span(),
        );

        let workers = (0..config.concurrency)
            .map(|id| {
                let worker = Worker {
                    id,
                    db: Arc::clone(&self.db),
                    write_ratio: config.write_ratio,
                    payload_size: config.payload_size,
                    origin,
                    rng: SmallRng::seed_from_u64(self.seeder.gen()),
                    completion: Arc::clone(&completion),
                    last_value: None,
                };
                tokio::spawn(
                    worker
                        .run(jobs_rx.clone(), outcomes_tx.clone())
                        .in_current_span(),
                )
            })
            .collect();

        Pipeline {
            jobs: jobs_tx,
            workers,
            collector,
            completion,
            submitted: 0,
        }
    }

    async fn stop_target(&self) {
        if let Err(err) = self.db.stop().await {
            error!("Target failed to stop: {err}");
        }
    }

    fn check(&self) -> Result<Option<u64>, BenchmarkError> {
        let anomalies = self
            .db
            .check_linearizability()
            .map_err(|err| BenchmarkError::Check(Box::new(err)))?;

        match anomalies {
            Some(0) => info!("Linearizability check passed"),
            Some(n) => warn!("Linearizability check found {n} anomalies"),
            None => warn!("Target has no linearizability checker; skipping."),
        }
        Ok(anomalies)
    }

    fn finish(
        &mut self,
        phase: Phase,
        config: &BenchmarkConfig,
        mut tally: Tally,
        collected: Collected,
        elapsed: Duration,
    ) -> Report {
        tally.writes = collected.writes;
        tally.reads = collected.reads;
        tally.failures = collected.failures;
        debug_assert_eq!(tally.submitted, tally.resolved());

        self.latency = collected.latency;
        Report {
            phase,
            distribution: config.distribution.clone(),
            concurrency: config.concurrency,
            write_ratio: config.write_ratio,
            keys: config.keys,
            tally,
            elapsed,
            throughput: Report::throughput(self.latency.len(), elapsed),
            statistics: Statistics::from_latencies(&self.latency),
            anomalies: None,
        }
    }
}

/// Queues, workers and collector of a single phase.
struct Pipeline {
    jobs: async_channel::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    collector: JoinHandle<Collected>,
    completion: Arc<Completion>,
    submitted: u64,
}

impl Pipeline {
    /// Hands a job to the worker pool, waiting while the queue is full.
    async fn submit(&mut self, job: Job) -> Result<(), BenchmarkError> {
        self.completion.add(1);
        if self.jobs.send(job).await.is_err() {
            self.completion.done();
            return Err(BenchmarkError::ChannelClosed);
        }
        self.submitted += 1;
        Ok(())
    }

    /// Stops accepting jobs and waits until every submitted one has been resolved.
    async fn drain(self) -> Result<(Tally, Collected), BenchmarkError> {
        // Workers keep receiving whatever is still queued after close.
        self.jobs.close();
        for worker in self.workers {
            worker.await?;
        }

        self.completion.wait().await;
        let collected = self.collector.await?;

        let tally = Tally {
            submitted: self.submitted,
            ..Default::default()
        };
        Ok((tally, collected))
    }
}
