//! Promoter trigger input.
//!
//! The workflow runner writes the triggering `issue_comment` webhook payload
//! to a file and passes its path in `GITHUB_EVENT_PATH`. This crate reads that
//! file, checks that it describes a newly created comment on a pull request,
//! and turns it into a [`promotion::CommentEvent`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Payload shapes and file access live here; the
//! [`promotion`] crate sees only the validated event.

use std::path::{Path, PathBuf};

use promotion::{CommentEvent, PullRequestNumber, UserLogin};
use serde::Deserialize;
use thiserror::Error;

/// Action of a newly posted comment.
pub const CREATED_ACTION: &str = "created";

/// The event payload could not be turned into a [`CommentEvent`].
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("failed to read event file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse event file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("the event is not a new comment (action {action:?})")]
    NotCreated { action: String },

    #[error("the commented issue is not a pull request")]
    NotPullRequest,

    #[error("invalid comment author login {login:?}")]
    InvalidLogin { login: String },
}

// ---------------------------------------------------------------------------
// Wire payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EventPayload {
    action: String,
    comment: CommentPayload,
    issue: IssuePayload,
}

#[derive(Debug, Deserialize)]
struct CommentPayload {
    body: String,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    number: u64,
    // Pull request issues carry a `pull_request` key.
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------

/// Reads and validates the event at `path`.
pub fn load_event(path: &Path) -> Result<CommentEvent, TriggerError> {
    let text = std::fs::read_to_string(path).map_err(|source| TriggerError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: EventPayload = serde_json::from_str(&text).map_err(|source| TriggerError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(payload)
}

fn validate(payload: EventPayload) -> Result<CommentEvent, TriggerError> {
    if payload.action != CREATED_ACTION {
        tracing::info!(action = %payload.action, "the event is not a new comment");
        return Err(TriggerError::NotCreated {
            action: payload.action,
        });
    }
    if !payload.issue.rest.contains_key("pull_request") {
        tracing::info!("the issue is not a pull request");
        return Err(TriggerError::NotPullRequest);
    }
    let requester = UserLogin::parse(&payload.comment.user.login).ok_or_else(|| {
        TriggerError::InvalidLogin {
            login: payload.comment.user.login.clone(),
        }
    })?;

    Ok(CommentEvent {
        number: PullRequestNumber::new(payload.issue.number),
        requester,
        body: payload.comment.body,
    })
}
