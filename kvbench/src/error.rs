use kvbench_core::ConfigError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Invalid benchmark configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Target failed to initialize: {0}")]
    Init(#[source] BoxError),

    #[error("Linearizability check failed: {0}")]
    Check(#[source] BoxError),

    #[error("Unable to persist report: {0}")]
    Report(#[from] std::io::Error),

    #[error("Worker queue closed unexpectedly.")]
    ChannelClosed,

    #[error("Benchmark task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BenchmarkError {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
