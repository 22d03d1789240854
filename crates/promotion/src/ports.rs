//! Port traits implemented by infrastructure crates.
//!
//! The workflow talks to the hosting platform only through
//! [`RepositoryService`] and to the local version-control tool only through
//! [`SourceControl`]. Every operation is an explicit request returning a
//! snapshot or a failure; nothing mutates remote state implicitly.

use std::path::Path;

use async_trait::async_trait;

use crate::{
    AppId, BranchName, BranchProtectionRule, BranchSnapshot, CommitSha, IssueSnapshot, LabelName,
    LockReason, Permission, PullRequestNumber, PullRequestSnapshot, PushOutcome,
    RemoteServiceError, RepositoryId, RepositorySettings, RepositorySnapshot, SourceControlError,
    TeamSlug, UserLogin,
};

/// Result alias for [`RepositoryService`] calls.
pub type RemoteResult<T> = Result<T, RemoteServiceError>;

/// The hosting platform, seen as a black-box repository service.
///
/// Organization-scoped operations take the organization login; repository
/// operations take a [`RepositoryId`].
#[async_trait]
pub trait RepositoryService: Send + Sync {
    /// Fetches a pull request.
    async fn get_pull_request(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> RemoteResult<PullRequestSnapshot>;

    /// Fetches a repository, returning `Ok(None)` if it does not exist.
    async fn get_repository(&self, repo: &RepositoryId) -> RemoteResult<Option<RepositorySnapshot>>;

    /// Creates a repository named `name` in `organization`.
    async fn create_repository(
        &self,
        organization: &str,
        name: &AppId,
    ) -> RemoteResult<RepositorySnapshot>;

    /// Updates repository metadata.
    async fn edit_repository(
        &self,
        repo: &RepositoryId,
        settings: &RepositorySettings,
    ) -> RemoteResult<()>;

    /// Fetches a branch with its head commit and protection flag.
    async fn get_branch(
        &self,
        repo: &RepositoryId,
        branch: &BranchName,
    ) -> RemoteResult<BranchSnapshot>;

    /// Removes a user from the repository's collaborators.
    async fn remove_collaborator(&self, repo: &RepositoryId, user: &UserLogin) -> RemoteResult<()>;

    /// Adds (or invites) a collaborator with the given permission.
    async fn add_collaborator(
        &self,
        repo: &RepositoryId,
        user: &UserLogin,
        permission: Permission,
    ) -> RemoteResult<()>;

    /// Returns `true` if `user` is an active member of the team.
    async fn is_team_member(
        &self,
        organization: &str,
        team: &TeamSlug,
        user: &UserLogin,
    ) -> RemoteResult<bool>;

    /// Grants a team a permission on a repository.
    async fn grant_team_permission(
        &self,
        organization: &str,
        team: &TeamSlug,
        repo: &RepositoryId,
        permission: Permission,
    ) -> RemoteResult<()>;

    /// Replaces the labels of an issue or pull request.
    async fn set_labels(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
        labels: &[LabelName],
    ) -> RemoteResult<()>;

    /// Posts a comment on an issue or pull request.
    async fn create_issue_comment(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
        body: &str,
    ) -> RemoteResult<()>;

    /// Transitions a pull request to closed.
    async fn close_pull_request(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> RemoteResult<()>;

    /// Fetches the issue backing a pull request.
    async fn get_issue(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> RemoteResult<IssueSnapshot>;

    /// Locks an issue's conversation.
    async fn lock_issue(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
        reason: LockReason,
    ) -> RemoteResult<()>;

    /// Returns the GraphQL node id of a repository.
    async fn repository_node_id(&self, repo: &RepositoryId) -> RemoteResult<String>;

    /// Creates a branch protection rule through the GraphQL mutation API and
    /// returns the new rule's id.
    async fn create_branch_protection_rule(
        &self,
        repository_node_id: &str,
        rule: &BranchProtectionRule,
    ) -> RemoteResult<String>;
}

/// The local version-control tool.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Clones `url` at `branch` into the empty directory `dest` and resolves
    /// submodules recursively.
    async fn clone_branch(
        &self,
        url: &str,
        branch: &BranchName,
        dest: &Path,
    ) -> Result<(), SourceControlError>;

    /// Reads the commit checked out in `repo_dir`.
    async fn head_sha(&self, repo_dir: &Path) -> Result<CommitSha, SourceControlError>;

    /// Registers a remote named `name`.
    async fn add_remote(
        &self,
        repo_dir: &Path,
        name: &str,
        url: &str,
    ) -> Result<(), SourceControlError>;

    /// Pushes `local_branch` to `remote_branch` on `remote`.
    ///
    /// A push that runs but exits non-zero is `Ok` with a failed
    /// [`PushOutcome`]; `Err` means the tool could not be run.
    async fn push(
        &self,
        repo_dir: &Path,
        remote: &str,
        local_branch: &BranchName,
        remote_branch: &BranchName,
    ) -> Result<PushOutcome, SourceControlError>;
}
