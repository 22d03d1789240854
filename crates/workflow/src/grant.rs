//! Access grants on the new repository.

use promotion::policy::teams_for;
use promotion::{
    AppId, Permission, PromotionConfig, PromotionError, RepositoryId, RepositoryService, UserLogin,
};

/// Gives push access to every collaborator, then to the policy teams.
///
/// `collaborators` is used in order and may contain duplicates; granting the
/// same permission twice is harmless.
pub async fn grant_access(
    service: &dyn RepositoryService,
    config: &PromotionConfig,
    app_id: &AppId,
    collaborators: &[UserLogin],
) -> Result<(), PromotionError> {
    let repo = RepositoryId::new(&config.organization, app_id.as_str())
        .ok_or_else(|| {
            PromotionError::invalid_input(format!("{app_id} is not a repository name"))
        })?;

    for user in collaborators {
        service.add_collaborator(&repo, user, Permission::Push).await?;
        tracing::info!(%user, "added collaborator");
    }

    for team in teams_for(app_id, config) {
        service
            .grant_team_permission(&config.organization, &team, &repo, Permission::Push)
            .await?;
        tracing::info!(%team, "granted team push access");
    }
    Ok(())
}
