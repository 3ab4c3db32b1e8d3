//! Memory probing and safe-limit estimation.

pub mod estimator;
pub mod probe;

pub use estimator::{AvailabilityEstimator, SafeLimit, DEFAULT_OVERHEAD_MARGIN_BYTES, GIB};
pub use probe::{parse_vm_stat, MemoryProbe, MemorySnapshot, SystemMemoryProbe, VmStat};
