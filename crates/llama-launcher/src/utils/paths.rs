use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Expand a leading `~` to the current user's home directory.
///
/// Anything else, including `~otheruser`, is returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    expand_home_with(path, home.as_deref())
}

fn expand_home_with(path: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(path);
    };

    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}
