use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use gitsyncr_auth::SshCredentials;
use gitsyncr_core::config::{Fork, Settings};
use gitsyncr_core::error::GitsyncrError;
use gitsyncr_core::models::sync_state::{SyncRecord, SyncStatus};

use crate::cancel::CancellationSupervisor;
use crate::fork_sync::{sync_fork, SyncContext};

/// How a run treats failures and slow remotes.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Record a failed fork and move on instead of stopping the run.
    pub keep_going: bool,
    /// Deadline for each pull and push.
    pub network_timeout: Option<Duration>,
    /// Draw a spinner while git transfers data.
    pub show_progress: bool,
}

impl SyncOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            keep_going: settings.keep_going,
            network_timeout: settings.network_timeout(),
            show_progress: true,
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub records: Vec<SyncRecord>,
    /// The error that stopped the run early, if any.
    pub aborted: Option<GitsyncrError>,
}

impl SyncReport {
    pub fn count(&self, status: SyncStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.records.iter().all(|r| r.status == SyncStatus::Success)
    }
}

/// Sync engine that runs fork syncs one after another, in name order.
pub struct SyncEngine {
    fork_root: PathBuf,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(fork_root: PathBuf, options: SyncOptions) -> Self {
        Self { fork_root, options }
    }

    fn spinner(&self) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        let pb = ProgressBar::new_spinner();
        pb.set_style(style);
        pb
    }

    /// Sync every fork. Stops at the first failure unless `keep_going` is
    /// set; a cancelled clone always stops the run.
    pub fn sync_all(
        &self,
        forks: &BTreeMap<String, Fork>,
        credentials: &SshCredentials,
        supervisor: &CancellationSupervisor,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        if let Err(e) = std::fs::create_dir_all(&self.fork_root) {
            report.aborted = Some(e.into());
            return report;
        }

        for (name, fork) in forks {
            let pb = self.spinner();
            pb.set_message(format!("syncing {name}"));
            let ctx = SyncContext {
                fork_root: &self.fork_root,
                credentials,
                supervisor,
                network_timeout: self.options.network_timeout,
                progress: &pb,
            };
            let result = sync_fork(name, fork, &ctx);
            pb.finish_and_clear();

            report.records.push(result.record);
            if let Some(err) = result.error {
                tracing::error!("{name}: {err}");
                if err.aborts_run() || !self.options.keep_going {
                    report.aborted = Some(err);
                    break;
                }
            }
        }

        report
    }
}
