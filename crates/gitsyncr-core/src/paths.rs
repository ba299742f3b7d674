//! Location of the config file, the checkout root and SSH keys.
//!
//! Environment overrides:
//! - `GITSYNCR_CONFIG`: path of the config file
//! - `GITSYNCR_CONFIG_DIR`: directory holding `config.toml` (earlier layout)
//! - `GITSYNCR_FORK_DIR`: directory the forks are checked out under

use std::path::{Path, PathBuf};

use crate::error::GitsyncrError;

pub const CONFIG_ENV: &str = "GITSYNCR_CONFIG";
pub const CONFIG_DIR_ENV: &str = "GITSYNCR_CONFIG_DIR";
pub const FORK_DIR_ENV: &str = "GITSYNCR_FORK_DIR";

const APP_DIR: &str = ".gitsyncr";
const CONFIG_FILE: &str = "config.toml";

/// Returns the user's home directory.
pub fn home_dir() -> Result<PathBuf, GitsyncrError> {
    dirs::home_dir().ok_or(GitsyncrError::HomeDirUnavailable)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Returns the config file path (`~/.gitsyncr/config.toml` unless overridden).
pub fn resolve_config_path() -> Result<PathBuf, GitsyncrError> {
    if let Some(path) = env_path(CONFIG_ENV) {
        return Ok(path);
    }
    if let Some(dir) = env_path(CONFIG_DIR_ENV) {
        return Ok(dir.join(CONFIG_FILE));
    }
    Ok(home_dir()?.join(APP_DIR).join(CONFIG_FILE))
}

/// Returns the directory forks are checked out under (home unless overridden).
pub fn resolve_fork_root() -> Result<PathBuf, GitsyncrError> {
    match env_path(FORK_DIR_ENV) {
        Some(dir) => Ok(dir),
        None => home_dir(),
    }
}

/// Expands a leading `~` to `home`.
///
/// A home of `/` yields `/x` for `~/x` rather than `//x`.
pub fn normalize_key_path(path: &str, home: &Path) -> PathBuf {
    let Some(rest) = path.strip_prefix('~') else {
        return PathBuf::from(path);
    };
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return home.to_path_buf();
    }
    if home == Path::new("/") {
        return PathBuf::from(format!("/{rest}"));
    }
    home.join(rest)
}
