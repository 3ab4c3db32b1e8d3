//! Launch Orchestrator
//!
//! Hands control to the server binary. On Unix the current process image is
//! replaced, so a successful launch never returns.

use crate::config_store::PersistedConfig;
use crate::error::{LaunchError, Result};
use crate::plan::LaunchPlan;
use std::convert::Infallible;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Advisory lookup used before any prompting. Never gates the launch.
pub fn find_binary(binary: &str) -> Option<PathBuf> {
    match which::which(binary) {
        Ok(path) => {
            debug!("Found {} at {}", binary, path.display());
            Some(path)
        }
        Err(e) => {
            debug!("{} not found: {}", binary, e);
            None
        }
    }
}

pub struct Launcher {
    binary: String,
    config_path: PathBuf,
}

impl Launcher {
    pub fn new(binary: impl Into<String>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            config_path: config_path.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// The configured model directory, or the fatal configuration error that
    /// tells the user which file to fix.
    pub fn working_dir(&self, config: &PersistedConfig) -> Result<PathBuf> {
        config
            .resolved_model_dir()
            .ok_or_else(|| LaunchError::configuration(&self.config_path))
    }

    pub fn resolve_binary(&self) -> Result<PathBuf> {
        which::which(&self.binary).map_err(|_| LaunchError::BinaryNotFound(self.binary.clone()))
    }

    pub fn command(&self, program: &Path, plan: &LaunchPlan) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(plan.args());
        cmd
    }

    /// Change into the model directory and replace this process with the
    /// server. Returns only on failure.
    pub fn launch(&self, plan: &LaunchPlan, config: &PersistedConfig) -> Result<Infallible> {
        let cwd = self.working_dir(config)?;
        println!("\nSwitching to directory: {}", cwd.display());
        std::env::set_current_dir(&cwd)?;

        let program = self.resolve_binary()?;
        info!("Launching {} with {} argument(s)", program.display(), plan.args().len());
        println!("Starting server...");

        self.exec(self.command(&program, plan))
    }

    #[cfg(unix)]
    fn exec(&self, mut cmd: Command) -> Result<Infallible> {
        use std::os::unix::process::CommandExt;

        let err = cmd.exec();
        Err(self.exec_error(err))
    }

    #[cfg(not(unix))]
    fn exec(&self, mut cmd: Command) -> Result<Infallible> {
        // No exec(2) here: run the server as a child and exit with its status.
        let status = cmd.status().map_err(|e| self.exec_error(e))?;
        std::process::exit(status.code().unwrap_or(1));
    }

    fn exec_error(&self, err: io::Error) -> LaunchError {
        if err.kind() == io::ErrorKind::NotFound {
            LaunchError::BinaryNotFound(self.binary.clone())
        } else {
            LaunchError::Exec {
                binary: self.binary.clone(),
                source: err,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::MODEL_DIR_KEY;
    use tempfile::TempDir;

    fn plan() -> LaunchPlan {
        LaunchPlan {
            model: "m.gguf".to_string(),
            alias: "m".to_string(),
            ctx_size: 4096,
            n_predict: 256,
            gpu_layers: 0,
            batch_size: 512,
            ubatch_size: 256,
            port: 8080,
            parallel_slots: 2,
            flash_attn: true,
            jinja: false,
        }
    }

    #[test]
    fn test_missing_model_dir_is_configuration_error() {
        let launcher = Launcher::new("llama-server", "/home/me/.llama_cli_config");
        let err = launcher.working_dir(&PersistedConfig::default()).unwrap_err();
        assert!(matches!(err, LaunchError::Configuration { .. }));
        assert!(err.to_string().contains("/home/me/.llama_cli_config"));
    }

    #[test]
    fn test_launch_without_model_dir_fails_before_exec() {
        let launcher = Launcher::new("llama-server", "cfg");
        let mut config = PersistedConfig::default();
        config.set(MODEL_DIR_KEY, "/definitely/not/a/dir");
        let err = launcher.launch(&plan(), &config).unwrap_err();
        assert!(matches!(err, LaunchError::Configuration { .. }));
    }

    #[test]
    fn test_working_dir_resolves_configured_directory() {
        let dir = TempDir::new().unwrap();
        let mut config = PersistedConfig::default();
        config.set(MODEL_DIR_KEY, &dir.path().display().to_string());
        let launcher = Launcher::new("llama-server", "cfg");
        assert_eq!(
            launcher.working_dir(&config).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[test]
    fn test_unknown_binary_not_found() {
        let launcher = Launcher::new("llama-server-that-does-not-exist-42", "cfg");
        let err = launcher.resolve_binary().unwrap_err();
        assert!(matches!(err, LaunchError::BinaryNotFound(ref b) if b == "llama-server-that-does-not-exist-42"));
        assert!(find_binary("llama-server-that-does-not-exist-42").is_none());
    }

    #[test]
    fn test_exec_error_mapping() {
        let launcher = Launcher::new("llama-server", "cfg");
        let not_found = launcher.exec_error(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(not_found, LaunchError::BinaryNotFound(_)));
        let denied = launcher.exec_error(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(matches!(denied, LaunchError::Exec { .. }));
    }

    #[test]
    fn test_command_carries_plan_arguments() {
        let launcher = Launcher::new("llama-server", "cfg");
        let cmd = launcher.command(Path::new("/usr/local/bin/llama-server"), &plan());
        assert_eq!(cmd.get_program(), "/usr/local/bin/llama-server");
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, plan().args());
        assert!(args.contains(&"-fa".to_string()));
    }
}
