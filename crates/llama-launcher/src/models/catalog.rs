use super::format_detector::FormatDetector;
use crate::error::{LaunchError, Result};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCandidate {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl ModelCandidate {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Model files found in one directory, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    candidates: Vec<ModelCandidate>,
}

impl ModelCatalog {
    pub fn scan(dir: &Path) -> io::Result<Self> {
        let mut candidates = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !FormatDetector::is_model_file(&path) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            candidates.push(ModelCandidate {
                path,
                size_bytes: metadata.len(),
            });
        }

        candidates.sort_by(|a, b| a.path.cmp(&b.path));
        info!("Found {} model(s) in {}", candidates.len(), dir.display());
        Ok(Self { candidates })
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }

    /// 1-based lookup, as shown in the selection menu.
    pub fn by_number(&self, number: usize) -> Option<&ModelCandidate> {
        number.checked_sub(1).and_then(|idx| self.candidates.get(idx))
    }
}

/// On-disk footprint of a model file.
///
/// Advisory only: the file may disappear between this check and the launch.
pub fn model_size(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
        Ok(_) => Err(LaunchError::ModelNotFound(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(LaunchError::ModelNotFound(path.to_path_buf()))
        }
        Err(e) => Err(LaunchError::Io(e)),
    }
}
