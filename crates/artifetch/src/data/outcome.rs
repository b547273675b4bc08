use std::ops::AddAssign;
use std::time::Duration;

/// Totals of a completed download.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    pub file_count: u64,
    pub total_bytes: u64,
    pub elapsed: Duration,
}

impl AddAssign for TransferOutcome {
    fn add_assign(&mut self, other: Self) {
        self.file_count += other.file_count;
        self.total_bytes += other.total_bytes;
        self.elapsed += other.elapsed;
    }
}

/// Totals of a completed publish.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub file_count: u64,
    pub total_bytes: u64,
    pub elapsed: Duration,
    /// Exit code of the external mirror tool, when one was used.
    pub exit_code: Option<i32>,
}
