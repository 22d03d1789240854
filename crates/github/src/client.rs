//! [`GithubClient`]: the [`RepositoryService`] port over the GitHub APIs.

use std::time::Duration;

use async_trait::async_trait;
use promotion::{
    AccessToken, AppId, BranchName, BranchProtectionRule, BranchSnapshot, IssueSnapshot, LabelName,
    LockReason, Permission, PullRequestNumber, PullRequestSnapshot, RemoteResult,
    RemoteServiceError, RepositoryId, RepositoryService, RepositorySettings, RepositorySnapshot,
    TeamSlug, UserLogin,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{
    Branch, CommentBody, CreateBranchProtectionData, CreateBranchProtectionRuleInput,
    CreateBranchProtectionVariables, CreateRepository, EditRepository, GraphqlRequest,
    GraphqlResponse, Issue, Labels, LockBody, PermissionBody, PullRequest, Repository,
    RepositoryIdData, RepositoryIdVariables, StateBody, TeamMembership,
    CREATE_BRANCH_PROTECTION_MUTATION, REPOSITORY_ID_QUERY,
};
use crate::GithubError;

const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST + GraphQL client authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    api_base_url: String,
    graphql_url: String,
}

impl GithubClient {
    /// Builds a client sending `token` on every request.
    pub fn new(
        token: &AccessToken,
        api_base_url: &str,
        graphql_url: &str,
    ) -> Result<Self, GithubError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| GithubError::InvalidToken)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("flathub-promoter/", env!("CARGO_PKG_VERSION"))),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            graphql_url: graphql_url.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    // -- HTTP helpers -------------------------------------------------------

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> RemoteResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteServiceError::new(operation, None, e.without_url().to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!(operation, status = status.as_u16(), %message, "request failed");
            Err(RemoteServiceError::new(operation, Some(status.as_u16()), message))
        }
    }

    async fn json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> RemoteResult<T> {
        self.send(operation, request)
            .await?
            .json()
            .await
            .map_err(|e| {
                RemoteServiceError::new(operation, None, format!("invalid response body: {e}"))
            })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> RemoteResult<T> {
        self.json(operation, self.http.get(self.url(path))).await
    }

    async fn put<B: Serialize>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> RemoteResult<()> {
        self.send(operation, self.http.put(self.url(path)).json(body)).await?;
        Ok(())
    }

    async fn graphql<V: Serialize, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &str,
        variables: V,
    ) -> RemoteResult<T> {
        let request = self
            .http
            .post(&self.graphql_url)
            .json(&GraphqlRequest { query, variables });
        let response: GraphqlResponse<T> = self.json(operation, request).await?;

        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(RemoteServiceError::new(operation, None, messages.join("; ")));
        }
        response
            .data
            .ok_or_else(|| RemoteServiceError::new(operation, None, "response has no data"))
    }
}

fn repo_path(repo: &RepositoryId) -> String {
    format!("/repos/{}/{}", repo.owner(), repo.name())
}

#[async_trait]
impl RepositoryService for GithubClient {
    async fn get_pull_request(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> RemoteResult<PullRequestSnapshot> {
        const OP: &str = "get_pull_request";
        let pr: PullRequest = self
            .get(OP, &format!("{}/pulls/{}", repo_path(repo), number.as_u64()))
            .await?;
        pr.into_snapshot(OP)
    }

    async fn get_repository(
        &self,
        repo: &RepositoryId,
    ) -> RemoteResult<Option<RepositorySnapshot>> {
        const OP: &str = "get_repository";
        match self.get::<Repository>(OP, &repo_path(repo)).await {
            Ok(found) => found.into_snapshot(OP).map(Some),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create_repository(
        &self,
        organization: &str,
        name: &AppId,
    ) -> RemoteResult<RepositorySnapshot> {
        const OP: &str = "create_repository";
        let request = self
            .http
            .post(self.url(&format!("/orgs/{organization}/repos")))
            .json(&CreateRepository { name: name.as_str() });
        let created: Repository = self.json(OP, request).await?;
        created.into_snapshot(OP)
    }

    async fn edit_repository(
        &self,
        repo: &RepositoryId,
        settings: &RepositorySettings,
    ) -> RemoteResult<()> {
        let body = EditRepository {
            homepage: &settings.homepage,
            delete_branch_on_merge: settings.delete_branch_on_merge,
        };
        self.send("edit_repository", self.http.patch(self.url(&repo_path(repo))).json(&body))
            .await?;
        Ok(())
    }

    async fn get_branch(
        &self,
        repo: &RepositoryId,
        branch: &BranchName,
    ) -> RemoteResult<BranchSnapshot> {
        const OP: &str = "get_branch";
        let found: Branch = self
            .get(OP, &format!("{}/branches/{}", repo_path(repo), branch))
            .await?;
        found.into_snapshot(OP)
    }

    async fn remove_collaborator(&self, repo: &RepositoryId, user: &UserLogin) -> RemoteResult<()> {
        let path = format!("{}/collaborators/{}", repo_path(repo), user);
        self.send("remove_collaborator", self.http.delete(self.url(&path))).await?;
        Ok(())
    }

    async fn add_collaborator(
        &self,
        repo: &RepositoryId,
        user: &UserLogin,
        permission: Permission,
    ) -> RemoteResult<()> {
        let path = format!("{}/collaborators/{}", repo_path(repo), user);
        let body = PermissionBody {
            permission: permission.as_str(),
        };
        self.put("add_collaborator", &path, &body).await
    }

    async fn is_team_member(
        &self,
        organization: &str,
        team: &TeamSlug,
        user: &UserLogin,
    ) -> RemoteResult<bool> {
        const OP: &str = "is_team_member";
        let path = format!("/orgs/{organization}/teams/{team}/memberships/{user}");
        match self.get::<TeamMembership>(OP, &path).await {
            Ok(membership) => Ok(membership.state == "active"),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn grant_team_permission(
        &self,
        organization: &str,
        team: &TeamSlug,
        repo: &RepositoryId,
        permission: Permission,
    ) -> RemoteResult<()> {
        let path = format!(
            "/orgs/{organization}/teams/{team}/repos/{}/{}",
            repo.owner(),
            repo.name()
        );
        let body = PermissionBody {
            permission: permission.as_str(),
        };
        self.put("grant_team_permission", &path, &body).await
    }

    async fn set_labels(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
        labels: &[LabelName],
    ) -> RemoteResult<()> {
        let path = format!("{}/issues/{}/labels", repo_path(repo), number.as_u64());
        let body = Labels {
            labels: labels.iter().map(LabelName::as_str).collect(),
        };
        self.put("set_labels", &path, &body).await
    }

    async fn create_issue_comment(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
        body: &str,
    ) -> RemoteResult<()> {
        let path = format!("{}/issues/{}/comments", repo_path(repo), number.as_u64());
        self.send(
            "create_issue_comment",
            self.http.post(self.url(&path)).json(&CommentBody { body }),
        )
        .await?;
        Ok(())
    }

    async fn close_pull_request(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> RemoteResult<()> {
        let path = format!("{}/pulls/{}", repo_path(repo), number.as_u64());
        self.send(
            "close_pull_request",
            self.http.patch(self.url(&path)).json(&StateBody { state: "closed" }),
        )
        .await?;
        Ok(())
    }

    async fn get_issue(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
    ) -> RemoteResult<IssueSnapshot> {
        let issue: Issue = self
            .get("get_issue", &format!("{}/issues/{}", repo_path(repo), number.as_u64()))
            .await?;
        Ok(issue.into())
    }

    async fn lock_issue(
        &self,
        repo: &RepositoryId,
        number: PullRequestNumber,
        reason: LockReason,
    ) -> RemoteResult<()> {
        let path = format!("{}/issues/{}/lock", repo_path(repo), number.as_u64());
        let body = LockBody {
            lock_reason: reason.as_str(),
        };
        self.put("lock_issue", &path, &body).await
    }

    async fn repository_node_id(&self, repo: &RepositoryId) -> RemoteResult<String> {
        const OP: &str = "repository_node_id";
        let data: RepositoryIdData = self
            .graphql(
                OP,
                REPOSITORY_ID_QUERY,
                RepositoryIdVariables {
                    owner: repo.owner(),
                    name: repo.name(),
                },
            )
            .await?;
        data.repository.map(|node| node.id).ok_or_else(|| {
            let status = Some(StatusCode::NOT_FOUND.as_u16());
            RemoteServiceError::new(OP, status, format!("{repo} not found"))
        })
    }

    async fn create_branch_protection_rule(
        &self,
        repository_node_id: &str,
        rule: &BranchProtectionRule,
    ) -> RemoteResult<String> {
        const OP: &str = "create_branch_protection_rule";
        let variables = CreateBranchProtectionVariables {
            input: CreateBranchProtectionRuleInput::new(repository_node_id, rule),
        };
        let data: CreateBranchProtectionData = self
            .graphql(OP, CREATE_BRANCH_PROTECTION_MUTATION, variables)
            .await?;
        data.create_branch_protection_rule
            .and_then(|created| created.branch_protection_rule)
            .map(|node| node.id)
            .ok_or_else(|| RemoteServiceError::new(OP, None, "no rule returned"))
    }
}
