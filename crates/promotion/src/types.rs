//! Shared value types for the promotion domain.
//!
//! Remote entities are represented as immutable snapshots returned by the
//! [`crate::ports::RepositoryService`] port. A snapshot never talks to the
//! network; to observe a change the caller fetches a fresh snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppId, BranchName, CommitSha, PullRequestNumber, UserLogin};

// ---------------------------------------------------------------------------
// Promotion request
// ---------------------------------------------------------------------------

/// A parsed `/merge` command.
///
/// Immutable once parsed: every field is present or the command did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRequest {
    /// Branch in the destination repository that receives the content.
    pub target_branch: BranchName,
    /// Pull request head commit approved by the reviewer.
    pub approved_head: CommitSha,
    /// Extra collaborators named in the command, in order, not de-duplicated.
    pub collaborators: Vec<UserLogin>,
}

/// A validated comment on a pull request of the intake repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEvent {
    /// Pull request the comment was posted on.
    pub number: PullRequestNumber,
    /// Author of the comment.
    pub requester: UserLogin,
    /// Raw comment text.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Bearer token used for the REST API, the GraphQL API, and the push URL.
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a token, returning `None` if it is empty or only whitespace.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.trim().is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the raw secret. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

// ---------------------------------------------------------------------------
// Remote entity snapshots
// ---------------------------------------------------------------------------

/// Open/closed state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    /// Still accepting changes.
    Open,
    /// Closed, merged or not.
    Closed,
}

impl std::fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// A pull request in the intake repository as last observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSnapshot {
    /// Pull request number in the intake repository.
    pub number: PullRequestNumber,
    /// Open or closed.
    pub state: PullRequestState,
    /// Branch name on the fork.
    pub head_branch: BranchName,
    /// Commit at the tip of [`Self::head_branch`].
    pub head_sha: CommitSha,
    /// Clone URL of the fork; `None` when the fork has been deleted.
    pub head_clone_url: Option<String>,
    /// Account that opened the pull request.
    pub author: UserLogin,
}

/// A repository in the destination organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Repository name, equal to the application id.
    pub name: AppId,
    /// Browser URL, e.g. `https://github.com/flathub/org.gnome.Maps`.
    pub html_url: String,
}

/// A branch of a destination repository as last observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSnapshot {
    /// Branch name.
    pub name: BranchName,
    /// Commit the branch points at.
    pub head_sha: CommitSha,
    /// Whether any protection rule matches the branch.
    pub protected: bool,
}

/// The discussion thread attached to a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    /// Shared with the pull request.
    pub number: PullRequestNumber,
    /// Whether the conversation is locked.
    pub locked: bool,
}

// ---------------------------------------------------------------------------
// Mutation payloads
// ---------------------------------------------------------------------------

/// Repository permission level granted to users and teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Push,
}

impl Permission {
    /// Wire name used by the REST API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
        }
    }
}

/// Reason recorded when locking a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    Resolved,
}

impl LockReason {
    /// Wire name used by the REST API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
        }
    }
}

/// Metadata applied to a freshly created repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySettings {
    /// Homepage URL shown on the repository page.
    pub homepage: String,
    /// Delete head branches once their pull request is merged.
    pub delete_branch_on_merge: bool,
}

/// A branch protection rule for one pattern.
///
/// Field names mirror the platform's `CreateBranchProtectionRuleInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchProtectionRule {
    /// Branch name or glob the rule applies to.
    pub pattern: BranchName,
    /// The branch may be deleted.
    pub allows_deletions: bool,
    /// Force pushes are accepted.
    pub allows_force_pushes: bool,
    /// New commits dismiss existing approvals.
    pub dismisses_stale_reviews: bool,
    /// Apply the rule to administrators too.
    pub is_admin_enforced: bool,
    /// Merges go through a pull request.
    pub requires_approving_reviews: bool,
    /// Approvals needed; zero allows self-merge after checks pass.
    pub required_approving_review_count: u32,
    /// Code owners must approve.
    pub requires_code_owner_reviews: bool,
    /// Named checks gate merging.
    pub requires_status_checks: bool,
    /// The branch must be up to date before merging.
    pub requires_strict_status_checks: bool,
    /// Only designated accounts may dismiss reviews.
    pub restricts_review_dismissals: bool,
    /// Checks that must pass before merging.
    pub required_status_check_contexts: Vec<String>,
}

// ---------------------------------------------------------------------------
// Local tool results
// ---------------------------------------------------------------------------

/// Result of a `push` invocation: exit status plus combined output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    /// Process exit code; `None` if terminated by a signal.
    pub exit_code: Option<i32>,
    /// Standard output followed by standard error.
    pub output: String,
}

impl PushOutcome {
    /// Returns `true` if the push exited with status zero.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// ---------------------------------------------------------------------------
// Step reports
// ---------------------------------------------------------------------------

/// One branch protection attempt and its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionAttempt {
    /// Pattern the rule was requested for.
    pub pattern: BranchName,
    /// Rule id on success, error message on failure.
    pub result: Result<String, String>,
}

impl ProtectionAttempt {
    /// Returns `true` if the rule was created.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// What the publication step did, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PublicationReport {
    /// One entry per configured protection pattern, in configuration order.
    pub protections: Vec<ProtectionAttempt>,
}

impl PublicationReport {
    /// Attempts that failed.
    pub fn failed_protections(&self) -> impl Iterator<Item = &ProtectionAttempt> {
        self.protections.iter().filter(|a| !a.succeeded())
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
