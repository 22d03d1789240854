//! Source acquisition: a verified local copy of the submission.

use std::path::Path;

use promotion::{
    BranchName, CommitSha, PromotionError, PullRequestSnapshot, PullRequestState, RepositoryId,
    RepositoryService, SourceControl,
};
use tempfile::TempDir;

/// A working copy checked out at the approved commit.
///
/// Owns its temporary directory, which is removed when the clone is dropped.
#[derive(Debug)]
pub struct LocalClone {
    dir: TempDir,
    branch: BranchName,
    head: CommitSha,
}

impl LocalClone {
    /// Root of the working copy.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The fork branch that was cloned.
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Commit checked out, verified equal to the approved head.
    pub fn head(&self) -> &CommitSha {
        &self.head
    }
}

/// Clones the pull request's fork and verifies it against the approved head.
///
/// The clone is accepted only if the live pull request is still open and both
/// the clone HEAD and the live pull request head equal `approved`. On any
/// failure the temporary directory is removed before returning.
pub async fn acquire(
    service: &dyn RepositoryService,
    scm: &dyn SourceControl,
    intake: &RepositoryId,
    pr: &PullRequestSnapshot,
    approved: &CommitSha,
) -> Result<LocalClone, PromotionError> {
    let url = pr
        .head_clone_url
        .as_deref()
        .ok_or(PromotionError::MissingHeadRepository { number: pr.number })?;

    let dir = tempfile::tempdir()?;
    tracing::info!(url, branch = %pr.head_branch, "cloning pull request branch");
    scm.clone_branch(url, &pr.head_branch, dir.path()).await?;

    let clone_head = scm.head_sha(dir.path()).await?;
    let live = service.get_pull_request(intake, pr.number).await?;

    if live.state != PullRequestState::Open {
        tracing::error!(state = %live.state, "pull request is not open");
        return Err(PromotionError::PullRequestNotOpen { number: pr.number });
    }

    tracing::info!(%clone_head, pr_head = %live.head_sha, %approved, "comparing HEAD SHAs");
    if &clone_head != approved || &live.head_sha != approved {
        tracing::error!(%clone_head, pr_head = %live.head_sha, %approved, "SHA mismatch");
        return Err(PromotionError::ShaMismatch {
            approved: approved.clone(),
            clone_head,
            pr_head: live.head_sha,
        });
    }

    Ok(LocalClone {
        dir,
        branch: pr.head_branch.clone(),
        head: clone_head,
    })
}
