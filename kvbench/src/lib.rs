#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod benchmark;
pub mod error;
pub mod keygen;
pub mod limiter;

pub use benchmark::Benchmark;
pub use error::BenchmarkError;
pub use keygen::{KeyGenerator, MeanShift};
pub use limiter::RateLimiter;

pub use kvbench_core::{
    BenchmarkConfig, ConfigError, Cutoff, Db, DistributionKind, Job, Key, LocalDb, Phase, Report,
    Statistics, Tally,
};

pub mod prelude {
    pub use crate::benchmark::Benchmark;
    pub use crate::error::BenchmarkError;
    pub use kvbench_core::{BenchmarkConfig, Db, Key, Report, Statistics};
}
