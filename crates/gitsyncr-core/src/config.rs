use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::GitsyncrError;
use crate::paths;

/// Top-level gitsyncr configuration, stored at `~/.gitsyncr/config.toml`.
///
/// Forks are kept in a `BTreeMap` so every run visits them in name order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "User", alias = "user")]
    pub user: User,

    #[serde(rename = "Forks", alias = "forks", default)]
    pub forks: BTreeMap<String, Fork>,

    #[serde(
        rename = "Settings",
        alias = "settings",
        default,
        skip_serializing_if = "Settings::is_default"
    )]
    pub settings: Settings,
}

/// Identity used for SSH-authenticated remotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Path to the SSH private key, `~` allowed.
    #[serde(rename = "Key", alias = "key")]
    pub key: String,

    /// SSH user name presented to the remote.
    #[serde(rename = "Username", alias = "username", default = "default_username")]
    pub username: String,

    /// Accepted for old config files, never used.
    #[serde(rename = "Password", alias = "password", default, skip_serializing)]
    pub password: Option<String>,
}

fn default_username() -> String {
    "git".to_string()
}

/// A fork and the upstream it tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    #[serde(rename = "Upstream", alias = "upstream")]
    pub upstream: String,

    #[serde(rename = "Fork", alias = "fork")]
    pub fork: String,
}

/// Optional run behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Deadline for pull and push. None waits indefinitely.
    #[serde(
        rename = "NetworkTimeoutSecs",
        alias = "network_timeout_secs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub network_timeout_secs: Option<u64>,

    /// Continue with the next fork after a failure instead of exiting.
    #[serde(rename = "KeepGoing", alias = "keep_going", default)]
    pub keep_going: bool,
}

impl Settings {
    fn is_default(&self) -> bool {
        *self == Settings::default()
    }

    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout_secs.map(Duration::from_secs)
    }
}

const SAMPLE_CONFIG: &str = r#"[User]
Key = "~/.ssh/id_rsa"

# One table per fork; the table name is the checkout directory name.
[Forks.linux]
Upstream = "git://git.kernel.org/pub/scm/linux/kernel/git/torvalds/linux.git"
Fork = "git@github.com:your-user/linux.git"
"#;

impl Config {
    /// Load config from the resolved location.
    pub fn load() -> Result<Self, GitsyncrError> {
        let path = paths::resolve_config_path()?;
        Self::load_from(&path)
    }

    /// Load and validate config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, GitsyncrError> {
        if !path.exists() {
            return Err(GitsyncrError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            forks = config.forks.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Parse and validate config text.
    pub fn parse(content: &str) -> Result<Self, GitsyncrError> {
        let config: Config =
            toml::from_str(content).map_err(|e| GitsyncrError::Serialization(e.to_string()))?;
        config.validate()?;
        if config.user.password.is_some() {
            tracing::warn!("User.Password is ignored; authentication uses the SSH key only");
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), GitsyncrError> {
        if self.user.key.trim().is_empty() {
            return Err(GitsyncrError::Config {
                message: "User.Key must name an SSH private key".into(),
            });
        }
        for (name, fork) in &self.forks {
            validate_fork_name(name)?;
            if fork.upstream.trim().is_empty() {
                return Err(GitsyncrError::InvalidFork {
                    name: name.clone(),
                    message: "Upstream URL is empty".into(),
                });
            }
            if fork.fork.trim().is_empty() {
                return Err(GitsyncrError::InvalidFork {
                    name: name.clone(),
                    message: "Fork URL is empty".into(),
                });
            }
        }
        Ok(())
    }

    /// Render the config as TOML.
    pub fn to_toml(&self) -> Result<String, GitsyncrError> {
        toml::to_string_pretty(self).map_err(|e| GitsyncrError::Serialization(e.to_string()))
    }

    /// Starter config text written by `config init`.
    pub fn sample() -> &'static str {
        SAMPLE_CONFIG
    }

    /// Write the sample config unless a file already exists.
    ///
    /// Returns `false` when an existing file was left untouched.
    pub fn write_sample(path: &Path) -> Result<bool, GitsyncrError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, SAMPLE_CONFIG)?;
        Ok(true)
    }
}

/// The fork name becomes a directory under the fork root.
fn validate_fork_name(name: &str) -> Result<(), GitsyncrError> {
    let invalid = |message: &str| GitsyncrError::InvalidFork {
        name: name.to_string(),
        message: message.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid("name must not be . or .."));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(invalid("name must be a single path segment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[User]
Key = "~/.ssh/id_rsa"

[Forks.linux]
Upstream = "git://git.kernel.org/pub/scm/linux/kernel/git/torvalds/linux.git"
Fork = "git@github.com:topikettunen/linux.git"

[Forks.kubernetes]
Upstream = "git@github.com:kubernetes/kubernetes.git"
Fork = "git@github.com:topikettunen/kubernetes.git"
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.user.key, "~/.ssh/id_rsa");
        assert_eq!(config.user.username, "git");
        assert_eq!(
            config.forks["linux"].upstream,
            "git://git.kernel.org/pub/scm/linux/kernel/git/torvalds/linux.git"
        );
        assert_eq!(
            config.forks["linux"].fork,
            "git@github.com:topikettunen/linux.git"
        );
        assert_eq!(
            config.forks["kubernetes"].upstream,
            "git@github.com:kubernetes/kubernetes.git"
        );
        assert_eq!(
            config.forks["kubernetes"].fork,
            "git@github.com:topikettunen/kubernetes.git"
        );
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn test_forks_iterate_in_name_order() {
        let config = Config::parse(SAMPLE).unwrap();
        let names: Vec<_> = config.forks.keys().cloned().collect();
        assert_eq!(names, vec!["kubernetes", "linux"]);
    }

    #[test]
    fn test_lowercase_keys_accepted() {
        let text = r#"
[user]
key = "/keys/id_ed25519"
password = "old"

[forks.foo]
upstream = "https://example.com/foo.git"
fork = "git@example.com:me/foo.git"

[settings]
network_timeout_secs = 30
keep_going = true
"#;
        let config = Config::parse(text).unwrap();
        assert_eq!(config.user.key, "/keys/id_ed25519");
        assert_eq!(config.forks["foo"].upstream, "https://example.com/foo.git");
        assert_eq!(config.settings.network_timeout(), Some(Duration::from_secs(30)));
        assert!(config.settings.keep_going);
    }

    #[test]
    fn test_empty_url_rejected() {
        let text = r#"
[User]
Key = "~/.ssh/id_rsa"

[Forks.broken]
Upstream = ""
Fork = "git@github.com:me/broken.git"
"#;
        let err = Config::parse(text).unwrap_err();
        assert!(matches!(err, GitsyncrError::InvalidFork { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_fork_name_must_be_path_segment() {
        assert!(validate_fork_name("linux").is_ok());
        assert!(validate_fork_name("a/b").is_err());
        assert!(validate_fork_name("..").is_err());
        assert!(validate_fork_name("").is_err());
    }

    #[test]
    fn test_malformed_toml_is_serialization_error() {
        let err = Config::parse("[User\nKey = ").unwrap_err();
        assert!(matches!(err, GitsyncrError::Serialization(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, GitsyncrError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_toml_roundtrip_keeps_forks() {
        let config = Config::parse(SAMPLE).unwrap();
        let rendered = config.to_toml().unwrap();
        assert_eq!(Config::parse(&rendered).unwrap(), config);
    }

    #[test]
    fn test_write_sample_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        assert!(Config::write_sample(&path).unwrap());
        std::fs::write(&path, "custom").unwrap();
        assert!(!Config::write_sample(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "custom");
    }

    #[test]
    fn test_sample_parses() {
        let config = Config::parse(Config::sample()).unwrap();
        assert!(config.forks.contains_key("linux"));
    }
}
