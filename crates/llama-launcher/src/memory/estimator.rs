use super::probe::MemorySnapshot;
use serde::{Deserialize, Serialize};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// Baseline reservation the OS keeps for itself.
pub const DEFAULT_OVERHEAD_MARGIN_BYTES: u64 = 2 * GIB;

/// Memory that can be promised to a new server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SafeLimit(u64);

impl SafeLimit {
    pub fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityEstimator {
    overhead_margin_bytes: u64,
}

impl Default for AvailabilityEstimator {
    fn default() -> Self {
        Self {
            overhead_margin_bytes: DEFAULT_OVERHEAD_MARGIN_BYTES,
        }
    }
}

impl AvailabilityEstimator {
    pub fn new(overhead_margin_bytes: u64) -> Self {
        Self {
            overhead_margin_bytes,
        }
    }

    pub fn overhead_margin_bytes(&self) -> u64 {
        self.overhead_margin_bytes
    }

    /// `total - (wired + compressed + margin)`, floored at zero.
    ///
    /// An unavailable snapshot stays unavailable: reporting zero here would
    /// read as "nothing fits" downstream.
    pub fn compute_safe_limit(&self, snapshot: Option<&MemorySnapshot>) -> Option<SafeLimit> {
        let snapshot = snapshot?;
        let claimed = snapshot
            .reserved_bytes()
            .saturating_add(self.overhead_margin_bytes);
        Some(SafeLimit(snapshot.total_bytes.saturating_sub(claimed)))
    }
}
