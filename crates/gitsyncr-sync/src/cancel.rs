//! Ctrl-C handling for clones.
//!
//! Only a clone in flight can be cancelled. An interrupt that arrives while
//! no clone is running (or a second one during a clone that is already
//! cancelled) terminates the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared cancellation flag polled from libgit2 progress callbacks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What an interrupt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The clone in flight was cancelled.
    CloneCancelled,
    /// The clone in flight had already been cancelled.
    AlreadyCancelled,
    /// No clone was running.
    Idle,
}

/// Holds the token of the clone currently running, if any.
#[derive(Debug, Clone, Default)]
pub struct CancellationSupervisor {
    active: Arc<Mutex<Option<CancelToken>>>,
}

impl CancellationSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arms a fresh token for a clone. Dropping the scope disarms it.
    pub fn begin_clone(&self) -> CloneScope {
        let token = CancelToken::new();
        *self.slot() = Some(token.clone());
        CloneScope {
            active: Arc::clone(&self.active),
            token,
        }
    }

    pub fn interrupt(&self) -> Interrupt {
        match self.slot().as_ref() {
            Some(token) if token.cancel() => Interrupt::CloneCancelled,
            Some(_) => Interrupt::AlreadyCancelled,
            None => Interrupt::Idle,
        }
    }

    pub fn clone_in_flight(&self) -> bool {
        self.slot().is_some()
    }
}

/// Cancellation scope of one clone.
#[derive(Debug)]
pub struct CloneScope {
    active: Arc<Mutex<Option<CancelToken>>>,
    token: CancelToken,
}

impl CloneScope {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for CloneScope {
    fn drop(&mut self) {
        let mut slot = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }
}

/// Exit status used when the process is stopped by Ctrl-C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Listens for Ctrl-C for the rest of the run.
pub fn spawn_interrupt_listener(supervisor: CancellationSupervisor) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("could not listen for Ctrl-C: {e}");
                return;
            }
            match supervisor.interrupt() {
                Interrupt::CloneCancelled => {
                    tracing::warn!("interrupt received, cancelling clone");
                }
                Interrupt::AlreadyCancelled | Interrupt::Idle => {
                    tracing::warn!("interrupt received, exiting");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_interrupt_without_clone_is_idle() {
        let supervisor = CancellationSupervisor::new();
        assert_eq!(supervisor.interrupt(), Interrupt::Idle);
    }

    #[test]
    fn test_interrupt_cancels_clone_in_flight() {
        let supervisor = CancellationSupervisor::new();
        let scope = supervisor.begin_clone();
        assert!(supervisor.clone_in_flight());

        assert_eq!(supervisor.interrupt(), Interrupt::CloneCancelled);
        assert!(scope.token().is_cancelled());
        assert_eq!(supervisor.interrupt(), Interrupt::AlreadyCancelled);
    }

    #[test]
    fn test_scope_drop_disarms() {
        let supervisor = CancellationSupervisor::new();
        let token = {
            let scope = supervisor.begin_clone();
            scope.token().clone()
        };
        assert!(!supervisor.clone_in_flight());
        assert_eq!(supervisor.interrupt(), Interrupt::Idle);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_each_clone_gets_fresh_token() {
        let supervisor = CancellationSupervisor::new();
        {
            let _first = supervisor.begin_clone();
            supervisor.interrupt();
        }
        let second = supervisor.begin_clone();
        assert!(!second.token().is_cancelled());
    }
}
