//! Model discovery and footprint inspection.
//!
//! Only direct children of the configured model directory are considered;
//! a file is a candidate when its extension marks it as GGUF.

pub mod catalog;
pub mod format_detector;

pub use catalog::{model_size, ModelCandidate, ModelCatalog};
pub use format_detector::{FormatDetector, MODEL_EXTENSION};
