//! Wire models for the REST and GraphQL payloads used by the client.
//!
//! Only the fields the promotion workflow reads are modelled; serde ignores
//! the rest. Conversions into domain snapshots validate identifiers and turn
//! malformed payloads into [`RemoteServiceError`]s.

use promotion::{
    AppId, BranchName, BranchProtectionRule, BranchSnapshot, CommitSha, IssueSnapshot,
    PullRequestNumber, PullRequestSnapshot, PullRequestState, RemoteServiceError,
    RepositorySnapshot, UserLogin,
};
use serde::{Deserialize, Serialize};

fn malformed(operation: &'static str, what: &str, value: &str) -> RemoteServiceError {
    RemoteServiceError::new(operation, None, format!("malformed {what} in response: {value:?}"))
}

// ---------------------------------------------------------------------------
// REST responses
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct HeadRepository {
    pub clone_url: String,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestHead {
    pub label: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    pub repo: Option<HeadRepository>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: String,
    pub head: PullRequestHead,
    pub user: User,
}

impl PullRequest {
    pub fn into_snapshot(
        self,
        operation: &'static str,
    ) -> Result<PullRequestSnapshot, RemoteServiceError> {
        let state = match self.state.as_str() {
            "open" => PullRequestState::Open,
            "closed" => PullRequestState::Closed,
            other => return Err(malformed(operation, "state", other)),
        };
        // The label is `owner:branch`; the branch part is authoritative.
        let head_branch = self
            .head
            .label
            .split_once(':')
            .map(|(_, branch)| branch)
            .unwrap_or(self.head.ref_name.as_str());
        Ok(PullRequestSnapshot {
            number: PullRequestNumber::new(self.number),
            state,
            head_branch: BranchName::new(head_branch)
                .ok_or_else(|| malformed(operation, "head branch", head_branch))?,
            head_sha: CommitSha::parse(&self.head.sha)
                .ok_or_else(|| malformed(operation, "head sha", &self.head.sha))?,
            head_clone_url: self.head.repo.map(|r| r.clone_url),
            author: UserLogin::parse(&self.user.login)
                .ok_or_else(|| malformed(operation, "author login", &self.user.login))?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub name: String,
    pub html_url: String,
}

impl Repository {
    pub fn into_snapshot(
        self,
        operation: &'static str,
    ) -> Result<RepositorySnapshot, RemoteServiceError> {
        Ok(RepositorySnapshot {
            name: AppId::parse(&self.name)
                .ok_or_else(|| malformed(operation, "repository name", &self.name))?,
            html_url: self.html_url,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: BranchCommit,
    pub protected: bool,
}

impl Branch {
    pub fn into_snapshot(
        self,
        operation: &'static str,
    ) -> Result<BranchSnapshot, RemoteServiceError> {
        Ok(BranchSnapshot {
            name: BranchName::new(self.name.as_str())
                .ok_or_else(|| malformed(operation, "branch name", &self.name))?,
            head_sha: CommitSha::parse(&self.commit.sha)
                .ok_or_else(|| malformed(operation, "commit sha", &self.commit.sha))?,
            protected: self.protected,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub locked: bool,
}

impl From<Issue> for IssueSnapshot {
    fn from(issue: Issue) -> Self {
        Self {
            number: PullRequestNumber::new(issue.number),
            locked: issue.locked,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TeamMembership {
    pub state: String,
}

// ---------------------------------------------------------------------------
// REST requests
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreateRepository<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct EditRepository<'a> {
    pub homepage: &'a str,
    pub delete_branch_on_merge: bool,
}

#[derive(Debug, Serialize)]
pub struct PermissionBody {
    pub permission: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Labels<'a> {
    pub labels: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CommentBody<'a> {
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub struct StateBody {
    pub state: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LockBody {
    pub lock_reason: &'static str,
}

// ---------------------------------------------------------------------------
// GraphQL
// ---------------------------------------------------------------------------

pub const REPOSITORY_ID_QUERY: &str = r#"
query repositoryId($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
  }
}"#;

pub const CREATE_BRANCH_PROTECTION_MUTATION: &str = r#"
mutation createBranchProtectionRule($input: CreateBranchProtectionRuleInput!) {
  createBranchProtectionRule(input: $input) {
    branchProtectionRule {
      id
    }
  }
}"#;

#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RepositoryIdVariables<'a> {
    pub owner: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryIdData {
    pub repository: Option<NodeId>,
}

#[derive(Debug, Deserialize)]
pub struct NodeId {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateBranchProtectionVariables<'a> {
    pub input: CreateBranchProtectionRuleInput<'a>,
}

/// `CreateBranchProtectionRuleInput` as the GraphQL schema names it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchProtectionRuleInput<'a> {
    pub repository_id: &'a str,
    pub pattern: &'a str,
    pub allows_deletions: bool,
    pub allows_force_pushes: bool,
    pub dismisses_stale_reviews: bool,
    pub is_admin_enforced: bool,
    pub requires_approving_reviews: bool,
    pub required_approving_review_count: u32,
    pub requires_code_owner_reviews: bool,
    pub requires_status_checks: bool,
    pub requires_strict_status_checks: bool,
    pub restricts_review_dismissals: bool,
    pub required_status_check_contexts: &'a [String],
}

impl<'a> CreateBranchProtectionRuleInput<'a> {
    pub fn new(repository_id: &'a str, rule: &'a BranchProtectionRule) -> Self {
        Self {
            repository_id,
            pattern: rule.pattern.as_str(),
            allows_deletions: rule.allows_deletions,
            allows_force_pushes: rule.allows_force_pushes,
            dismisses_stale_reviews: rule.dismisses_stale_reviews,
            is_admin_enforced: rule.is_admin_enforced,
            requires_approving_reviews: rule.requires_approving_reviews,
            required_approving_review_count: rule.required_approving_review_count,
            requires_code_owner_reviews: rule.requires_code_owner_reviews,
            requires_status_checks: rule.requires_status_checks,
            requires_strict_status_checks: rule.requires_strict_status_checks,
            restricts_review_dismissals: rule.restricts_review_dismissals,
            required_status_check_contexts: &rule.required_status_check_contexts,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchProtectionData {
    pub create_branch_protection_rule: Option<CreatedRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRule {
    pub branch_protection_rule: Option<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull_request_json(label: &str, repo: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "number": 7,
            "state": "open",
            "head": {
                "label": label,
                "ref": "ref-name",
                "sha": "ABCDEF0123456789abcdef0123456789abcdef01",
                "repo": repo,
            },
            "user": { "login": "alice" },
            "title": "ignored",
        })
    }

    #[test]
    fn pull_request_branch_comes_from_the_label() {
        let repo = serde_json::json!({"clone_url": "https://x/y.git"});
        let pr: PullRequest =
            serde_json::from_value(pull_request_json("alice:new-app", repo)).unwrap();
        let snapshot = pr.into_snapshot("get_pull_request").unwrap();
        assert_eq!(snapshot.head_branch.as_str(), "new-app");
        assert_eq!(snapshot.head_sha.as_str(), "abcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(snapshot.head_clone_url.as_deref(), Some("https://x/y.git"));
        assert_eq!(snapshot.author.as_str(), "alice");
    }

    #[test]
    fn deleted_fork_has_no_clone_url() {
        let pr: PullRequest =
            serde_json::from_value(pull_request_json("alice:new-app", serde_json::Value::Null))
                .unwrap();
        assert_eq!(pr.into_snapshot("get_pull_request").unwrap().head_clone_url, None);
    }

    #[test]
    fn protection_input_uses_schema_names() {
        let rule = promotion::policy::protection_rule(
            BranchName::new("beta/*").unwrap(),
            &promotion::PromotionConfig::default(),
        );
        let input = CreateBranchProtectionRuleInput::new("R_1", &rule);
        let value = serde_json::to_value(input).unwrap();
        assert_eq!(value["repositoryId"], "R_1");
        assert_eq!(value["pattern"], "beta/*");
        assert_eq!(value["requiresStrictStatusChecks"], true);
        assert_eq!(value["requiredApprovingReviewCount"], 0);
        assert_eq!(value["requiredStatusCheckContexts"], serde_json::json!(["builds/x86_64"]));
    }
}
