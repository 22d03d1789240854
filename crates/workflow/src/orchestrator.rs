//! The promotion state machine.
//!
//! ```text
//! PARSE → AUTHORIZE → ACQUIRE → RESOLVE → PROVISION → PUBLISH → GRANT
//!       → VERIFY_OPEN → CLOSE → VERIFY_CLOSED → DONE
//! ```
//!
//! Every state either advances or fails the whole run; [`PromotionFailure`]
//! names the state that failed. Nothing is retried and nothing is rolled back.

use std::future::Future;
use std::sync::Arc;

use promotion::{
    parse_merge_command, AccessToken, AppId, BranchName, CommentEvent, PromotionConfig,
    PromotionError, PromotionRunId, PublicationReport, PullRequestNumber, PullRequestState,
    RepositoryId, RepositoryService, RepositorySnapshot, SourceControl, Timestamp,
};
use thiserror::Error;
use tracing::Instrument;

use crate::acquire::acquire;
use crate::authorize::authorize;
use crate::close::close_pull_request;
use crate::grant::grant_access;
use crate::manifest::resolve_app_id;
use crate::provision::provision;
use crate::publish::{publish, PublishTarget};

// ---------------------------------------------------------------------------
// States and results
// ---------------------------------------------------------------------------

/// A step of the promotion workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionState {
    Parse,
    Authorize,
    Acquire,
    Resolve,
    Provision,
    Publish,
    Grant,
    VerifyOpen,
    Close,
    VerifyClosed,
}

impl PromotionState {
    /// Upper-case name used in span names and failure messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "PARSE",
            Self::Authorize => "AUTHORIZE",
            Self::Acquire => "ACQUIRE",
            Self::Resolve => "RESOLVE",
            Self::Provision => "PROVISION",
            Self::Publish => "PUBLISH",
            Self::Grant => "GRANT",
            Self::VerifyOpen => "VERIFY_OPEN",
            Self::Close => "CLOSE",
            Self::VerifyClosed => "VERIFY_CLOSED",
        }
    }
}

impl std::fmt::Display for PromotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed promotion.
#[derive(Debug, Clone)]
pub struct PromotionOutcome {
    /// Identifier attached to every span of the run.
    pub run_id: PromotionRunId,
    /// Application id resolved from the manifest.
    pub app_id: AppId,
    /// The newly created destination repository.
    pub repository: RepositorySnapshot,
    /// Branch the approved commit was pushed to.
    pub target_branch: BranchName,
    /// Push output and protection attempts.
    pub report: PublicationReport,
    /// When the run entered PARSE.
    pub started_at: Timestamp,
    /// When CLOSE completed.
    pub finished_at: Timestamp,
}

/// A promotion that stopped in `state`.
#[derive(Debug, Error)]
#[error("promotion failed in {state}: {error}")]
pub struct PromotionFailure {
    /// State that was running when the error occurred.
    pub state: PromotionState,
    /// Cause of the failure.
    #[source]
    pub error: PromotionError,
}

// ---------------------------------------------------------------------------
// Promoter
// ---------------------------------------------------------------------------

/// Runs one promotion per triggering comment.
pub struct Promoter {
    service: Arc<dyn RepositoryService>,
    scm: Arc<dyn SourceControl>,
    config: PromotionConfig,
    token: AccessToken,
}

impl Promoter {
    /// Wires the platform and version-control ports; `token` authenticates the push.
    #[must_use]
    pub fn new(
        service: Arc<dyn RepositoryService>,
        scm: Arc<dyn SourceControl>,
        config: PromotionConfig,
        token: AccessToken,
    ) -> Self {
        Self {
            service,
            scm,
            config,
            token,
        }
    }

    /// Promotes the pull request `event` was posted on.
    pub async fn run(&self, event: &CommentEvent) -> Result<PromotionOutcome, PromotionFailure> {
        let run_id = PromotionRunId::new_random();
        let span = tracing::info_span!(
            "promotion",
            %run_id,
            pr = %event.number,
            requester = %event.requester
        );
        self.run_states(run_id, event).instrument(span).await
    }

    async fn run_states(
        &self,
        run_id: PromotionRunId,
        event: &CommentEvent,
    ) -> Result<PromotionOutcome, PromotionFailure> {
        let started_at = Timestamp::now();
        let service = self.service.as_ref();
        let scm = self.scm.as_ref();
        let config = &self.config;

        let (intake, request) = step(PromotionState::Parse, async {
            let intake = config
                .intake()
                .ok_or_else(|| {
                    PromotionError::invalid_input("intake repository is not configured")
                })?;
            let request = parse_merge_command(&event.body)
                .map_err(|e| PromotionError::invalid_input(e.to_string()))?
                .ok_or_else(|| PromotionError::invalid_input("comment is not a '/merge' command"))?;
            Ok::<_, PromotionError>((intake, request))
        })
        .await?;

        step(
            PromotionState::Authorize,
            authorize(service, config, &event.requester),
        )
        .await?;

        let (pr, clone) = step(PromotionState::Acquire, async {
            let pr = service.get_pull_request(&intake, event.number).await?;
            let clone = acquire(service, scm, &intake, &pr, &request.approved_head).await?;
            Ok::<_, PromotionError>((pr, clone))
        })
        .await?;

        let manifest = step(PromotionState::Resolve, async {
            resolve_app_id(clone.path())?.ok_or(PromotionError::ManifestNotFound)
        })
        .await?;
        let app_id = manifest.app_id;

        let repository = step(PromotionState::Provision, async {
            provision(service, config, &app_id)
                .await?
                .ok_or_else(|| PromotionError::RepositoryAlreadyExists {
                    app_id: app_id.clone(),
                })
        })
        .await?;

        let target = PublishTarget {
            app_id: &app_id,
            branch: &request.target_branch,
            approved: &request.approved_head,
        };
        let report = step(
            PromotionState::Publish,
            publish(service, scm, config, &self.token, &clone, target),
        )
        .await?;
        drop(clone);

        let mut collaborators = request.collaborators.clone();
        collaborators.push(pr.author.clone());
        step(
            PromotionState::Grant,
            grant_access(service, config, &app_id, &collaborators),
        )
        .await?;

        step(
            PromotionState::VerifyOpen,
            expect_state(service, &intake, pr.number, PullRequestState::Open),
        )
        .await?;

        step(
            PromotionState::Close,
            close_pull_request(service, config, &intake, pr.number, &repository.html_url),
        )
        .await?;

        step(
            PromotionState::VerifyClosed,
            expect_state(service, &intake, pr.number, PullRequestState::Closed),
        )
        .await?;

        tracing::info!(%app_id, url = %repository.html_url, "promotion complete");
        Ok(PromotionOutcome {
            run_id,
            app_id,
            repository,
            target_branch: request.target_branch,
            report,
            started_at,
            finished_at: Timestamp::now(),
        })
    }
}

/// Runs one state inside its span and tags a failure with the state.
async fn step<T>(
    state: PromotionState,
    work: impl Future<Output = Result<T, PromotionError>>,
) -> Result<T, PromotionFailure> {
    let span = tracing::info_span!("state", name = state.as_str());
    async {
        tracing::info!("entering state");
        work.await
    }
    .instrument(span)
    .await
    .map_err(|error| {
        tracing::error!(%state, %error, "promotion failed");
        PromotionFailure { state, error }
    })
}

async fn expect_state(
    service: &dyn RepositoryService,
    intake: &RepositoryId,
    number: PullRequestNumber,
    expected: PullRequestState,
) -> Result<(), PromotionError> {
    let pr = service.get_pull_request(intake, number).await?;
    match (expected, pr.state) {
        (PullRequestState::Open, PullRequestState::Open)
        | (PullRequestState::Closed, PullRequestState::Closed) => Ok(()),
        (PullRequestState::Open, _) => Err(PromotionError::PullRequestNotOpen { number }),
        (PullRequestState::Closed, _) => Err(PromotionError::PullRequestNotClosed { number }),
    }
}
