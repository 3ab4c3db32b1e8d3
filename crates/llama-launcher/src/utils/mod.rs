//! Utilities module - byte formatting, shell quoting and path expansion

pub mod paths;
pub mod text_utils;

// Re-export commonly used utilities
pub use paths::expand_home;
pub use text_utils::TextUtils;
