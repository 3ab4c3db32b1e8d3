//! Detects model files by extension
use std::path::Path;

/// Extension of the model files llama-server loads.
pub const MODEL_EXTENSION: &str = "gguf";

pub struct FormatDetector;

impl FormatDetector {
    /// Case-insensitive, so `Model.GGUF` qualifies.
    pub fn is_model_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION))
            .unwrap_or(false)
    }
}
