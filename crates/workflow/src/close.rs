//! Closure of the originating pull request.

use promotion::policy::closing_comment;
use promotion::{
    LabelName, LockReason, PromotionConfig, PromotionError, PullRequestNumber, RepositoryId,
    RepositoryService,
};

/// Labels, comments on, closes and locks the pull request.
pub async fn close_pull_request(
    service: &dyn RepositoryService,
    config: &PromotionConfig,
    intake: &RepositoryId,
    number: PullRequestNumber,
    repository_url: &str,
) -> Result<(), PromotionError> {
    let labels: Vec<LabelName> = LabelName::new(config.ready_label.as_str()).into_iter().collect();
    service.set_labels(intake, number, &labels).await?;

    service
        .create_issue_comment(intake, number, &closing_comment(repository_url, config))
        .await?;
    service.close_pull_request(intake, number).await?;
    tracing::info!(pr = %number, "closed pull request");

    let issue = service.get_issue(intake, number).await?;
    if issue.locked {
        tracing::info!(pr = %number, "conversation already locked");
    } else {
        service.lock_issue(intake, number, LockReason::Resolved).await?;
        tracing::info!(pr = %number, "locked conversation");
    }
    Ok(())
}
