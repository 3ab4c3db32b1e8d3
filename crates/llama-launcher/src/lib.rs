// llama-launcher/src/lib.rs

pub mod advisor;
pub mod config;
pub mod config_store;
pub mod error;
pub mod launcher;
pub mod memory;
pub mod models;
pub mod plan;
pub mod prompt;
pub mod session;
pub mod telemetry;
pub mod utils;

// Public API exports
pub use config::{LaunchDefaults, LauncherConfig};
pub use error::{LaunchError, Result};
pub use launcher::Launcher;
pub use plan::LaunchPlan;
pub use session::{Session, SessionOutcome};

pub use advisor::{ContextFitAdvisor, LocalPortProbe, PortConflictResolver};
pub use memory::{AvailabilityEstimator, MemorySnapshot, SafeLimit, SystemMemoryProbe};
pub use prompt::Prompter;
#[cfg(feature = "cli")]
pub use prompt::TerminalPrompter;
