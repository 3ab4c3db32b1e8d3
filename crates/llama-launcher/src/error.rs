//! Error taxonomy for a launch session.
//!
//! Only [`LaunchError::Configuration`] and [`LaunchError::BinaryNotFound`] end a
//! session on their own. The advisory failures are handled where they occur and
//! degrade to "no advisory" instead of reaching the caller.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    /// Memory statistics could not be read on this host.
    #[error("memory statistics are not available on this platform")]
    ProbeUnavailable,

    #[error("model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// No usable model directory is configured. Fatal.
    #[error("{message}")]
    Configuration { message: String },

    /// The target binary is not on PATH at invocation time. Fatal.
    #[error("'{0}' command not found in PATH")]
    BinaryNotFound(String),

    #[error("'{input}' is not a valid {expected}")]
    Parse { input: String, expected: &'static str },

    /// Ctrl-C while waiting for input.
    #[error("aborted by user")]
    Interrupted,

    #[error("failed to execute {binary}: {source}")]
    Exec {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("prompt error: {0}")]
    Prompt(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl LaunchError {
    pub fn configuration(config_path: &std::path::Path) -> Self {
        Self::Configuration {
            message: format!(
                "Could not determine model directory from configuration.\n\
                 Please ensure {} exists and has a valid 'model_dir'.",
                config_path.display()
            ),
        }
    }

    /// Conditions the tool cannot work around. Everything else is advisory.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LaunchError::Configuration { .. }
                | LaunchError::BinaryNotFound(_)
                | LaunchError::Exec { .. }
        )
    }
}

#[cfg(feature = "cli")]
impl From<dialoguer::Error> for LaunchError {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::Interrupted => {
                LaunchError::Interrupted
            }
            dialoguer::Error::IO(e) => LaunchError::Prompt(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;
