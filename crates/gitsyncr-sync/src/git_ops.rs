//! libgit2 operations used by the sync workflow.
//!
//! Each network operation takes optional SSH credentials and reports the
//! steady-state results (remote exists, nothing to pull, nothing to push)
//! as outcomes rather than errors.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::time::{Duration, Instant};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{ErrorCode, FetchOptions, PushOptions, RemoteCallbacks, Repository};
use indicatif::ProgressBar;

use gitsyncr_auth::SshCredentials;
use gitsyncr_core::error::GitsyncrError;
use gitsyncr_core::models::sync_state::{PullOutcome, PushOutcome, RemoteOutcome};

use crate::cancel::CancelToken;

fn git_err(op: &'static str) -> impl Fn(git2::Error) -> GitsyncrError {
    move |e| GitsyncrError::GitError {
        op,
        message: e.message().to_string(),
    }
}

/// Conditions under which a progress callback aborts the transfer.
#[derive(Debug, Default)]
struct Abort {
    cancel: Option<CancelToken>,
    deadline: Option<(Instant, Duration)>,
}

impl Abort {
    fn cancellable(token: &CancelToken) -> Self {
        Self {
            cancel: Some(token.clone()),
            deadline: None,
        }
    }

    /// Starts the clock for `timeout`, if one is set.
    fn deadline(timeout: Option<Duration>) -> Self {
        Self {
            cancel: None,
            deadline: timeout.map(|t| (Instant::now() + t, t)),
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn expired(&self) -> bool {
        self.deadline
            .is_some_and(|(deadline, _)| Instant::now() >= deadline)
    }

    fn triggered(&self) -> bool {
        self.cancelled() || self.expired()
    }

    /// Maps a libgit2 failure, naming the abort reason when one fired.
    fn error(&self, op: &'static str, label: &str, e: git2::Error) -> GitsyncrError {
        if self.cancelled() {
            return GitsyncrError::Cancelled {
                fork: label.to_string(),
            };
        }
        if let Some((deadline, timeout)) = self.deadline {
            if Instant::now() >= deadline {
                return GitsyncrError::TimedOut {
                    op,
                    secs: timeout.as_secs(),
                };
            }
        }
        git_err(op)(e)
    }
}

/// Callbacks shared by clone, fetch and push.
///
/// The SSH key is offered once; a second request means the remote rejected
/// it, and libgit2 would otherwise keep asking.
fn callbacks<'a>(
    creds: Option<&'a SshCredentials>,
    abort: &'a Abort,
    progress: &'a ProgressBar,
    label: &'a str,
) -> RemoteCallbacks<'a> {
    let mut cb = RemoteCallbacks::new();
    if let Some(creds) = creds {
        let mut key_offered = false;
        cb.credentials(move |_url, username_from_url, allowed| {
            if allowed.is_username() {
                return git2::Cred::username(username_from_url.unwrap_or(creds.username()));
            }
            if allowed.is_ssh_key() {
                if key_offered {
                    return Err(git2::Error::from_str(&format!(
                        "ssh key {} was rejected",
                        creds.private_key().display()
                    )));
                }
                key_offered = true;
                return creds.to_cred(username_from_url);
            }
            Err(git2::Error::from_str(
                "remote asked for credentials other than an ssh key",
            ))
        });
    }
    cb.transfer_progress(move |stats| {
        progress.set_message(format!(
            "{label}: {}/{} objects, {} KiB",
            stats.received_objects(),
            stats.total_objects(),
            stats.received_bytes() / 1024
        ));
        !abort.triggered()
    });
    cb.sideband_progress(move |_| !abort.triggered());
    cb
}

/// Clones only `branch` of `url` into `dest`, naming the remote `remote_name`.
///
/// `cancel` is checked before starting and on every progress update. A
/// cancelled clone leaves whatever was already written in `dest`.
pub fn clone_single_branch(
    url: &str,
    dest: &Path,
    remote_name: &str,
    branch: &str,
    creds: Option<&SshCredentials>,
    cancel: &CancelToken,
    progress: &ProgressBar,
) -> Result<(), GitsyncrError> {
    let label = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dest.display().to_string());
    if cancel.is_cancelled() {
        return Err(GitsyncrError::Cancelled { fork: label });
    }

    let abort = Abort::cancellable(cancel);
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks(creds, &abort, progress, &label));

    let refspec = format!("+refs/heads/{branch}:refs/remotes/{remote_name}/{branch}");
    let mut builder = RepoBuilder::new();
    builder
        .branch(branch)
        .fetch_options(fetch)
        .remote_create(|repo, _name, url| repo.remote_with_fetch(remote_name, url, &refspec));

    match builder.clone(url, dest) {
        Ok(_) => Ok(()),
        Err(e) => Err(abort.error("clone", &label, e)),
    }
}

/// Makes sure remote `name` exists and points at `url`.
///
/// libgit2 reports an existing remote as `ErrorCode::Exists`; that case is
/// success. A differing URL is repointed.
pub fn ensure_remote(
    repo: &Repository,
    name: &str,
    url: &str,
) -> Result<RemoteOutcome, GitsyncrError> {
    match repo.remote(name, url) {
        Ok(_) => Ok(RemoteOutcome::Created),
        Err(e) if e.code() == ErrorCode::Exists => {
            let existing = repo.find_remote(name).map_err(git_err("remote"))?;
            if existing.url() == Some(url) {
                return Ok(RemoteOutcome::AlreadyExists);
            }
            tracing::warn!(
                "remote {name} pointed at {}, repointing to {url}",
                existing.url().unwrap_or("<non-utf8>")
            );
            repo.remote_set_url(name, url).map_err(git_err("remote"))?;
            Ok(RemoteOutcome::Updated)
        }
        Err(e) => Err(git_err("remote")(e)),
    }
}

/// Fetches `branch` from `remote_name` and fast-forwards the local branch.
///
/// Diverged history is `NonFastForward`; nothing is merged. When the branch
/// is checked out, the working tree is updated with a safe checkout, which
/// fails instead of overwriting local edits.
pub fn pull(
    repo: &Repository,
    remote_name: &str,
    branch: &str,
    creds: Option<&SshCredentials>,
    timeout: Option<Duration>,
    progress: &ProgressBar,
) -> Result<PullOutcome, GitsyncrError> {
    let mut remote = repo.find_remote(remote_name).map_err(git_err("pull"))?;
    let abort = Abort::deadline(timeout);
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks(creds, &abort, progress, remote_name));

    let tracking = format!("refs/remotes/{remote_name}/{branch}");
    let refspec = format!("+refs/heads/{branch}:{tracking}");
    remote
        .fetch(&[refspec.as_str()], Some(&mut fetch), None)
        .map_err(|e| abort.error("pull", remote_name, e))?;

    let fetched = repo.refname_to_id(&tracking).map_err(git_err("pull"))?;
    let local_ref = format!("refs/heads/{branch}");

    let mut local = match repo.find_reference(&local_ref) {
        Ok(reference) => reference,
        Err(e) if e.code() == ErrorCode::NotFound => {
            checkout_if_head(repo, &local_ref, fetched)?;
            repo.reference(&local_ref, fetched, false, "gitsyncr: create from upstream")
                .map_err(git_err("pull"))?;
            return Ok(PullOutcome::FastForwarded);
        }
        Err(e) => return Err(git_err("pull")(e)),
    };

    let theirs = repo
        .find_annotated_commit(fetched)
        .map_err(git_err("pull"))?;
    let (analysis, _) = repo
        .merge_analysis_for_ref(&local, &[&theirs])
        .map_err(git_err("pull"))?;

    if analysis.is_up_to_date() {
        return Ok(PullOutcome::UpToDate);
    }
    if !analysis.is_fast_forward() {
        return Err(GitsyncrError::NonFastForward {
            remote: remote_name.to_string(),
            branch: branch.to_string(),
        });
    }

    checkout_if_head(repo, &local_ref, fetched)?;
    local
        .set_target(fetched, "gitsyncr: fast-forward")
        .map_err(git_err("pull"))?;
    Ok(PullOutcome::FastForwarded)
}

/// Updates the working tree to `target` when `refname` is checked out.
fn checkout_if_head(
    repo: &Repository,
    refname: &str,
    target: git2::Oid,
) -> Result<(), GitsyncrError> {
    if repo.is_bare() {
        return Ok(());
    }
    let head_ref = repo
        .find_reference("HEAD")
        .ok()
        .and_then(|head| head.symbolic_target().map(str::to_owned));
    if head_ref.as_deref() != Some(refname) {
        return Ok(());
    }
    let object = repo.find_object(target, None).map_err(git_err("checkout"))?;
    repo.checkout_tree(&object, Some(CheckoutBuilder::new().safe()))
        .map_err(git_err("checkout"))
}

/// Pushes local `branch` to the same branch on `remote_name`.
///
/// Negotiation compares the remote's current target with the local one;
/// when every update is a no-op the push stops there and nothing is sent.
pub fn push(
    repo: &Repository,
    remote_name: &str,
    branch: &str,
    creds: Option<&SshCredentials>,
    timeout: Option<Duration>,
    progress: &ProgressBar,
) -> Result<PushOutcome, GitsyncrError> {
    let refname = format!("refs/heads/{branch}");
    repo.refname_to_id(&refname).map_err(git_err("push"))?;
    let mut remote = repo.find_remote(remote_name).map_err(git_err("push"))?;
    let abort = Abort::deadline(timeout);

    let up_to_date = Cell::new(false);
    let rejection: RefCell<Option<String>> = RefCell::new(None);
    let pushed = {
        let mut cb = callbacks(creds, &abort, progress, remote_name);
        cb.push_update_reference(|name, status| {
            if let Some(message) = status {
                *rejection.borrow_mut() = Some(format!("{name}: {message}"));
            }
            Ok(())
        });
        cb.push_negotiation(|updates| {
            if abort.triggered() {
                return Err(git2::Error::from_str("push deadline exceeded"));
            }
            if updates.iter().all(|update| update.src() == update.dst()) {
                up_to_date.set(true);
                return Err(git2::Error::from_str("remote is up to date"));
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(cb);

        let refspec = format!("{refname}:{refname}");
        remote.push(&[refspec.as_str()], Some(&mut options))
    };

    if up_to_date.get() {
        return Ok(PushOutcome::UpToDate);
    }
    pushed.map_err(|e| abort.error("push", remote_name, e))?;
    if let Some(message) = rejection.into_inner() {
        return Err(GitsyncrError::PushRejected {
            remote: remote_name.to_string(),
            message,
        });
    }
    Ok(PushOutcome::Pushed)
}
