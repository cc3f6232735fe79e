use std::time::Duration;

/// A key in the target's key space.
pub type Key = u64;

/// A generated key paired with the sequence number it was assigned at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub key: Key,
    pub sequence: u64,
}

/// One attempted operation, from just before dispatch until the target answers.
///
/// Timestamps are relative to the start of the phase. An operation whose write failed keeps
/// `end == None`; only completed operations ever contribute a latency sample.
#[derive(Debug, Clone, Default)]
pub struct Operation {
    pub input: Option<Vec<u8>>,
    pub output: Option<Vec<u8>>,
    pub start: Duration,
    pub end: Option<Duration>,
}

impl Operation {
    pub fn is_complete(&self) -> bool {
        self.end.is_some()
    }

    pub fn latency(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_sub(self.start))
    }
}
