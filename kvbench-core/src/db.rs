use crate::data::Key;

/// Client interface of the system under test.
///
/// Implement [`Db`], the `Send` variant, to drive a target from the benchmark's worker pool.
/// Every method is awaited by exactly one task; the time spent inside [`Db::write`] is what
/// the benchmark measures.
#[trait_variant::make(Db: Send)]
pub trait LocalDb {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Prepares the target for incoming operations. Called once before each phase.
    async fn init(&self) -> Result<(), Self::Error>;

    /// Performs one write. `sequence` is strictly increasing in generation order.
    async fn write(&self, key: Key, value: &[u8], sequence: u64) -> Result<(), Self::Error>;

    /// Releases the target once a phase has stopped submitting work.
    async fn stop(&self) -> Result<(), Self::Error>;

    /// Runs the target's own linearizability checker over what it observed.
    ///
    /// Returns the number of anomalies, or `None` when the target has no checker.
    fn check_linearizability(&self) -> Result<Option<u64>, Self::Error> {
        Ok(None)
    }
}
