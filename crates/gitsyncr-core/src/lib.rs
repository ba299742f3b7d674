pub mod config;
pub mod error;
pub mod models;
pub mod paths;

/// The only branch gitsyncr tracks, on every remote.
pub const BRANCH: &str = "master";

/// Remote name for the repository a fork tracks.
pub const UPSTREAM_REMOTE: &str = "upstream";

/// Remote name for the user's own fork.
pub const FORK_REMOTE: &str = "fork";
