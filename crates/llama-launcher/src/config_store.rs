//! Persisted launcher configuration.
//!
//! A plain text file of `key=value` lines. Blank lines and lines starting
//! with `#` are ignored, the first `=` splits key from value and both are
//! trimmed. Only `model_dir` is interpreted; other keys survive a rewrite.

use crate::error::Result;
use crate::utils::expand_home;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const MODEL_DIR_KEY: &str = "model_dir";
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".llama_cli_config";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedConfig {
    entries: BTreeMap<String, String>,
}

impl PersistedConfig {
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self { entries }
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    /// The model directory as written, before `~` expansion.
    pub fn model_dir(&self) -> Option<&str> {
        self.get(MODEL_DIR_KEY).filter(|v| !v.is_empty())
    }

    /// The configured model directory, expanded and made absolute, if it
    /// exists as a directory. A relative `model_dir` resolves against the
    /// current directory, so model paths built from it survive the chdir
    /// before launch.
    pub fn resolved_model_dir(&self) -> Option<PathBuf> {
        let expanded = expand_home(self.model_dir()?);
        match fs::canonicalize(&expanded) {
            Ok(dir) if dir.is_dir() => Some(dir),
            _ => {
                debug!("Configured model_dir {} is not a directory", expanded.display());
                None
            }
        }
    }
}

/// Reads and writes the config file at one path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file yields an empty config.
    pub fn load(&self) -> PersistedConfig {
        match fs::read_to_string(&self.path) {
            Ok(contents) => PersistedConfig::parse(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => PersistedConfig::default(),
            Err(e) => {
                warn!("Could not read {}: {}", self.path.display(), e);
                PersistedConfig::default()
            }
        }
    }

    /// Atomic replace: the new contents go to a temp file in the same
    /// directory, which is flushed, synced and renamed over the old file.
    pub fn save(&self, config: &PersistedConfig) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(config.render().as_bytes())?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        info!("Saved configuration to {}", self.path.display());
        Ok(())
    }

    /// Set `model_dir` and persist immediately, keeping any other keys.
    pub fn save_model_dir(&self, model_dir: &str) -> Result<PersistedConfig> {
        let mut config = self.load();
        config.set(MODEL_DIR_KEY, model_dir);
        self.save(&config)?;
        Ok(config)
    }
}
