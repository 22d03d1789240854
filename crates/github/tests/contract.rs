//! HTTP contract tests for `GithubClient` against a mock server.

use github::GithubClient;
use promotion::{
    AccessToken, AppId, BranchName, LabelName, LockReason, Permission, PromotionConfig,
    PullRequestNumber, PullRequestState, RepositoryId, RepositoryService, RepositorySettings,
    TeamSlug, UserLogin,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

async fn client(server: &MockServer) -> GithubClient {
    GithubClient::new(
        &AccessToken::new("test-token").unwrap(),
        &server.uri(),
        &format!("{}/graphql", server.uri()),
    )
    .unwrap()
}

fn repo() -> RepositoryId {
    RepositoryId::parse("flathub/org.example.App").unwrap()
}

fn intake() -> RepositoryId {
    RepositoryId::parse("flathub/flathub").unwrap()
}

#[tokio::test]
async fn requests_carry_bearer_token_and_accept_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/flathub/flathub/pulls/42"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 42,
            "state": "open",
            "head": {
                "label": "alice:new-app",
                "ref": "new-app",
                "sha": SHA,
                "repo": { "clone_url": "https://github.com/alice/flathub.git" }
            },
            "user": { "login": "alice" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pr = client(&server)
        .await
        .get_pull_request(&intake(), PullRequestNumber::new(42))
        .await
        .unwrap();

    assert_eq!(pr.state, PullRequestState::Open);
    assert_eq!(pr.head_branch.as_str(), "new-app");
    assert_eq!(pr.head_sha.as_str(), SHA);
    assert_eq!(pr.author.as_str(), "alice");
}

#[tokio::test]
async fn missing_repository_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/flathub/org.example.App"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let found = client(&server).await.get_repository(&repo()).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn other_lookup_errors_are_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/flathub/org.example.App"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).await.get_repository(&repo()).await.unwrap_err();
    assert_eq!(err.operation, "get_repository");
    assert_eq!(err.status, Some(502));
    assert_eq!(err.message, "bad gateway");
}

#[tokio::test]
async fn repository_is_created_in_the_organization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/flathub/repos"))
        .and(body_json(json!({"name": "org.example.App"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "org.example.App",
            "html_url": "https://github.com/flathub/org.example.App"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)
        .await
        .create_repository("flathub", &AppId::parse("org.example.App").unwrap())
        .await
        .unwrap();
    assert_eq!(created.html_url, "https://github.com/flathub/org.example.App");
}

#[tokio::test]
async fn repository_settings_are_patched() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/repos/flathub/org.example.App"))
        .and(body_json(json!({
            "homepage": "https://flathub.org/apps/details/org.example.App",
            "delete_branch_on_merge": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let settings = RepositorySettings {
        homepage: "https://flathub.org/apps/details/org.example.App".into(),
        delete_branch_on_merge: true,
    };
    client(&server).await.edit_repository(&repo(), &settings).await.unwrap();
}

#[tokio::test]
async fn branch_snapshot_includes_protection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/flathub/org.example.App/branches/master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "master",
            "commit": { "sha": SHA },
            "protected": true
        })))
        .mount(&server)
        .await;

    let branch = client(&server)
        .await
        .get_branch(&repo(), &BranchName::new("master").unwrap())
        .await
        .unwrap();
    assert_eq!(branch.head_sha.as_str(), SHA);
    assert!(branch.protected);
}

#[tokio::test]
async fn team_membership_requires_active_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/flathub/teams/reviewers/memberships/bob"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"state": "active", "role": "member"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/flathub/teams/reviewers/memberships/carol"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"state": "pending", "role": "member"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/flathub/teams/reviewers/memberships/mallory"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let team = TeamSlug::new("reviewers").unwrap();
    let member = |login: &str| UserLogin::parse(login).unwrap();
    assert!(client.is_team_member("flathub", &team, &member("bob")).await.unwrap());
    assert!(!client.is_team_member("flathub", &team, &member("carol")).await.unwrap());
    assert!(!client.is_team_member("flathub", &team, &member("mallory")).await.unwrap());
}

#[tokio::test]
async fn collaborators_and_teams_get_push() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/repos/flathub/org.example.App/collaborators/alice"))
        .and(body_json(json!({"permission": "push"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/orgs/flathub/teams/trusted-maintainers/repos/flathub/org.example.App"))
        .and(body_json(json!({"permission": "push"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/repos/flathub/org.example.App/collaborators/flathubbot"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    client
        .add_collaborator(&repo(), &UserLogin::parse("alice").unwrap(), Permission::Push)
        .await
        .unwrap();
    client
        .grant_team_permission(
            "flathub",
            &TeamSlug::new("trusted-maintainers").unwrap(),
            &repo(),
            Permission::Push,
        )
        .await
        .unwrap();
    client
        .remove_collaborator(&repo(), &UserLogin::parse("flathubbot").unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn closure_requests_match_the_rest_api() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/repos/flathub/flathub/issues/42/labels"))
        .and(body_json(json!({"labels": ["ready"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/flathub/flathub/issues/42/comments"))
        .and(body_json(json!({"body": "done"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/flathub/flathub/pulls/42"))
        .and(body_json(json!({"state": "closed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/flathub/flathub/issues/42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"number": 42, "locked": false})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/flathub/flathub/issues/42/lock"))
        .and(body_json(json!({"lock_reason": "resolved"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let number = PullRequestNumber::new(42);
    client
        .set_labels(&intake(), number, &[LabelName::new("ready").unwrap()])
        .await
        .unwrap();
    client.create_issue_comment(&intake(), number, "done").await.unwrap();
    client.close_pull_request(&intake(), number).await.unwrap();
    assert!(!client.get_issue(&intake(), number).await.unwrap().locked);
    client.lock_issue(&intake(), number, LockReason::Resolved).await.unwrap();
}

#[tokio::test]
async fn repository_node_id_comes_from_graphql() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "variables": { "owner": "flathub", "name": "org.example.App" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "repository": { "id": "R_kgDOabc" } }
        })))
        .mount(&server)
        .await;

    let id = client(&server).await.repository_node_id(&repo()).await.unwrap();
    assert_eq!(id, "R_kgDOabc");
}

#[tokio::test]
async fn protection_rule_mutation_sends_the_full_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "variables": { "input": {
                "repositoryId": "R_1",
                "pattern": "branch/*",
                "allowsDeletions": false,
                "allowsForcePushes": false,
                "requiresApprovingReviews": true,
                "requiredApprovingReviewCount": 0,
                "requiresStatusChecks": true,
                "requiresStrictStatusChecks": true,
                "requiredStatusCheckContexts": ["builds/x86_64"]
            }}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "createBranchProtectionRule": { "branchProtectionRule": { "id": "BPR_1" } } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rule = promotion::policy::protection_rule(
        BranchName::new("branch/*").unwrap(),
        &PromotionConfig::default(),
    );
    let id = client(&server)
        .await
        .create_branch_protection_rule("R_1", &rule)
        .await
        .unwrap();
    assert_eq!(id, "BPR_1");
}

#[tokio::test]
async fn graphql_errors_fail_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Name already protected: master" }]
        })))
        .mount(&server)
        .await;

    let rule = promotion::policy::protection_rule(
        BranchName::new("master").unwrap(),
        &PromotionConfig::default(),
    );
    let err = client(&server)
        .await
        .create_branch_protection_rule("R_1", &rule)
        .await
        .unwrap_err();
    assert_eq!(err.operation, "create_branch_protection_rule");
    assert!(err.message.contains("Name already protected"));
}
