pub mod cancel;
pub mod engine;
pub mod fork_sync;
pub mod git_ops;
