//! Error taxonomy for the promotion workflow.
//!
//! [`PromotionError`] covers every condition that aborts a promotion. Port
//! failures are wrapped from their own types: [`RemoteServiceError`] for the
//! hosting platform and [`SourceControlError`] for the local version-control
//! tool.
//!
//! Every error is terminal for the invocation. Nothing here is retried: the
//! side effects already performed (created repositories, granted access) are
//! not reversible by this system, so a human re-runs the command instead.

use thiserror::Error;

use crate::{AppId, BranchName, CommitSha, PullRequestNumber, UserLogin};

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// A call to the hosting platform failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{operation} failed{}: {message}", status_suffix(.status))]
pub struct RemoteServiceError {
    /// Name of the port operation, e.g. `"create_repository"`.
    pub operation: &'static str,
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    /// Response body or transport error message.
    pub message: String,
}

impl RemoteServiceError {
    /// Creates an error for `operation`; `status` is `None` for transport failures.
    #[must_use]
    pub fn new(operation: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            operation,
            status,
            message: message.into(),
        }
    }

    /// Returns `true` if the platform answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// A local version-control operation failed to run or reported an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceControlError {
    /// The tool could not be spawned at all.
    #[error("failed to run {program}: {message}")]
    Spawn { program: String, message: String },

    /// The tool ran and exited unsuccessfully.
    #[error("{command} exited with {exit_code:?}: {output}")]
    Failed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// The tool produced output that could not be interpreted.
    #[error("unexpected output from {command}: {output}")]
    UnexpectedOutput { command: String, output: String },
}

// ---------------------------------------------------------------------------
// Workflow errors
// ---------------------------------------------------------------------------

/// Why a promotion aborted.
#[derive(Debug, Error)]
pub enum PromotionError {
    /// Missing token, malformed event payload, or unparsable command.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The comment author may not trigger promotions.
    #[error("{requester} is not a reviewer or an admin")]
    Unauthorized { requester: UserLogin },

    /// The pull request was not open when it had to be.
    #[error("pull request {number} is unexpectedly not open")]
    PullRequestNotOpen { number: PullRequestNumber },

    /// The pull request was not closed after the closure step.
    #[error("pull request {number} is unexpectedly not closed")]
    PullRequestNotClosed { number: PullRequestNumber },

    /// The approved SHA disagrees with the clone or the live pull request.
    #[error("SHA mismatch: clone HEAD {clone_head}, PR HEAD {pr_head}, expected {approved}")]
    ShaMismatch {
        approved: CommitSha,
        clone_head: CommitSha,
        pr_head: CommitSha,
    },

    /// The pull request's fork is gone, so there is nothing to clone.
    #[error("pull request {number} has no head repository")]
    MissingHeadRepository { number: PullRequestNumber },

    /// No manifest in the clone declares an id equal to its own file name.
    #[error("no self-naming manifest found in the submission")]
    ManifestNotFound,

    /// The destination repository already exists; it is never reused.
    #[error("repository {app_id} already exists")]
    RepositoryAlreadyExists { app_id: AppId },

    /// `push` exited unsuccessfully.
    #[error("push failed with exit code {exit_code:?}:\n{output}")]
    PushRejected { exit_code: Option<i32>, output: String },

    /// The destination branch head differs from the approved SHA after the push.
    #[error("remote HEAD SHA {remote_head} of {branch} does not match approved SHA {approved}")]
    RemoteHeadMismatch {
        branch: BranchName,
        remote_head: CommitSha,
        approved: CommitSha,
    },

    /// The destination branch is not protected after applying the rules.
    #[error("remote branch {branch} is not protected")]
    BranchNotProtected { branch: BranchName },

    #[error(transparent)]
    Remote(#[from] RemoteServiceError),

    #[error(transparent)]
    SourceControl(#[from] SourceControlError),

    #[error("local I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl PromotionError {
    /// Shorthand for [`PromotionError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display_includes_status() {
        let err = RemoteServiceError::new("get_branch", Some(502), "bad gateway");
        assert_eq!(err.to_string(), "get_branch failed (HTTP 502): bad gateway");
    }

    #[test]
    fn remote_error_display_without_status() {
        let err = RemoteServiceError::new("get_branch", None, "connection reset");
        assert_eq!(err.to_string(), "get_branch failed: connection reset");
    }

    #[test]
    fn not_found_is_detected_from_status() {
        assert!(RemoteServiceError::new("get_repository", Some(404), "").is_not_found());
        assert!(!RemoteServiceError::new("get_repository", Some(403), "").is_not_found());
    }

    #[test]
    fn sha_mismatch_reports_every_checkpoint() {
        let a = CommitSha::parse(&"a".repeat(40)).unwrap();
        let b = CommitSha::parse(&"b".repeat(40)).unwrap();
        let err = PromotionError::ShaMismatch {
            approved: a.clone(),
            clone_head: a,
            pr_head: b,
        };
        let text = err.to_string();
        assert!(text.contains(&"a".repeat(40)));
        assert!(text.contains(&"b".repeat(40)));
    }
}
