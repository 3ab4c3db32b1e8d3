//! Resource-safety advisories: context sizing against safe memory and
//! port conflict resolution. Both are advisory; the user can always
//! override a warning by confirming it.

pub mod context_fit;
pub mod port_conflict;

pub use context_fit::{
    first_fit, suggest_default_context, ContextCostModel, ContextFitAdvisor, FitAssessment,
    CONTEXT_CANDIDATES, DEFAULT_MIB_PER_TOKEN,
};
pub use port_conflict::{LocalPortProbe, PortConflictResolver, PortProbe, PortState};
