//! Authorization gate: only admins and reviewers may promote.

use promotion::{PromotionConfig, PromotionError, RepositoryService, UserLogin};

/// Succeeds if `requester` is an active member of the admin team or the
/// reviewer team. Membership is queried on every call.
pub async fn authorize(
    service: &dyn RepositoryService,
    config: &PromotionConfig,
    requester: &UserLogin,
) -> Result<(), PromotionError> {
    let teams = [config.admin_team(), config.reviewer_team()];
    for team in teams.iter().flatten() {
        if service
            .is_team_member(&config.organization, team, requester)
            .await?
        {
            tracing::info!(%requester, %team, "requester is authorized");
            return Ok(());
        }
    }

    tracing::error!(%requester, "requester is not a reviewer or an admin");
    Err(PromotionError::Unauthorized {
        requester: requester.clone(),
    })
}
