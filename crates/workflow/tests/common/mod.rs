//! Shared fixtures for the workflow integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use promotion::fakes::{MemoryRepositoryService, ScriptedSourceControl};
use promotion::{
    AccessToken, BranchName, CommentEvent, CommitSha, PromotionConfig, PullRequestNumber,
    PullRequestSnapshot, PullRequestState, RepositoryId, UserLogin,
};
use workflow::Promoter;

pub const APP_ID: &str = "org.example.App";
pub const AUTHOR: &str = "alice";
pub const REVIEWER: &str = "bob";
pub const PR_NUMBER: u64 = 42;

pub fn sha(digit: char) -> CommitSha {
    CommitSha::parse(&digit.to_string().repeat(40)).unwrap()
}

pub fn approved() -> CommitSha {
    sha('a')
}

pub fn intake() -> RepositoryId {
    RepositoryId::parse("flathub/flathub").unwrap()
}

pub fn destination(app_id: &str) -> RepositoryId {
    RepositoryId::new("flathub", app_id).unwrap()
}

pub fn number() -> PullRequestNumber {
    PullRequestNumber::new(PR_NUMBER)
}

pub fn config() -> PromotionConfig {
    PromotionConfig {
        settle_delay_secs: 0,
        ..Default::default()
    }
}

pub fn pull_request(head: CommitSha) -> PullRequestSnapshot {
    PullRequestSnapshot {
        number: number(),
        state: PullRequestState::Open,
        head_branch: BranchName::new("new-app").unwrap(),
        head_sha: head,
        head_clone_url: Some(format!("https://github.com/{AUTHOR}/flathub.git")),
        author: UserLogin::parse(AUTHOR).unwrap(),
    }
}

pub fn manifest(app_id: &str) -> (String, String) {
    (
        format!("{app_id}.yml"),
        format!("app-id: {app_id}\nruntime: org.freedesktop.Platform\n"),
    )
}

/// A platform with an open pull request at the approved head and a reviewer.
pub fn service() -> Arc<MemoryRepositoryService> {
    let service = Arc::new(MemoryRepositoryService::new());
    service.insert_pull_request(&intake(), pull_request(approved()));
    service.add_team_member("reviewers", REVIEWER);
    service
}

/// A clone at the approved head containing a manifest for `app_id`,
/// publishing to `service`.
pub fn scm_for(service: &Arc<MemoryRepositoryService>, app_id: &str) -> ScriptedSourceControl {
    let (name, contents) = manifest(app_id);
    ScriptedSourceControl::new(approved())
        .with_file(name, contents)
        .publishing_to(Arc::clone(service))
}

pub fn comment(requester: &str, body: &str) -> CommentEvent {
    CommentEvent {
        number: number(),
        requester: UserLogin::parse(requester).unwrap(),
        body: body.to_string(),
    }
}

pub fn merge_comment(extra: &str) -> CommentEvent {
    comment(REVIEWER, &format!("/merge head={}{extra}", approved()))
}

pub fn promoter(
    service: &Arc<MemoryRepositoryService>,
    scm: &Arc<ScriptedSourceControl>,
    config: PromotionConfig,
) -> Promoter {
    Promoter::new(
        service.clone(),
        scm.clone(),
        config,
        AccessToken::new("ghs_test_token").unwrap(),
    )
}
