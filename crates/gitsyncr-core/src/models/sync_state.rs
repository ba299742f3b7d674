use chrono::{DateTime, Utc};

/// Final status of one fork's sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Success,
    Failed,
    Cancelled,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Failed => write!(f, "failed"),
            SyncStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of pulling the tracked branch from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForwarded,
}

/// How the local checkout was brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutAction {
    Cloned,
    Pulled(PullOutcome),
}

impl std::fmt::Display for CheckoutAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutAction::Cloned => write!(f, "cloned"),
            CheckoutAction::Pulled(PullOutcome::UpToDate) => write!(f, "up to date"),
            CheckoutAction::Pulled(PullOutcome::FastForwarded) => write!(f, "fast-forwarded"),
        }
    }
}

/// Result of making sure a named remote exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Created,
    AlreadyExists,
    /// The remote existed with another URL and was repointed.
    Updated,
}

impl std::fmt::Display for RemoteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteOutcome::Created => write!(f, "created"),
            RemoteOutcome::AlreadyExists => write!(f, "exists"),
            RemoteOutcome::Updated => write!(f, "updated"),
        }
    }
}

/// Result of publishing the tracked branch to the fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    UpToDate,
    Pushed,
}

impl std::fmt::Display for PushOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushOutcome::UpToDate => write!(f, "up to date"),
            PushOutcome::Pushed => write!(f, "pushed"),
        }
    }
}

/// Record of one fork's pass through the sync workflow.
///
/// Steps that never ran stay `None` / empty.
#[derive(Debug, Clone)]
pub struct SyncRecord {
    pub fork_name: String,
    pub checkout: Option<CheckoutAction>,
    pub remotes: Vec<(String, RemoteOutcome)>,
    pub push: Option<PushOutcome>,
    pub status: SyncStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncRecord {
    pub fn new(fork_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            fork_name: fork_name.into(),
            checkout: None,
            remotes: Vec::new(),
            push: None,
            status: SyncStatus::Success,
            error: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// True when neither the checkout nor the fork changed.
    pub fn is_noop(&self) -> bool {
        self.checkout == Some(CheckoutAction::Pulled(PullOutcome::UpToDate))
            && self.push == Some(PushOutcome::UpToDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_no_steps() {
        let record = SyncRecord::new("linux");
        assert_eq!(record.fork_name, "linux");
        assert!(record.checkout.is_none());
        assert!(record.push.is_none());
        assert_eq!(record.status, SyncStatus::Success);
    }

    #[test]
    fn test_noop_requires_pull_and_push_up_to_date() {
        let mut record = SyncRecord::new("linux");
        record.checkout = Some(CheckoutAction::Pulled(PullOutcome::UpToDate));
        assert!(!record.is_noop());
        record.push = Some(PushOutcome::UpToDate);
        assert!(record.is_noop());
        record.checkout = Some(CheckoutAction::Cloned);
        assert!(!record.is_noop());
    }
}
