//! Destination provisioning.

use std::time::Duration;

use promotion::policy::homepage_url;
use promotion::{
    AppId, PromotionConfig, PromotionError, RepositoryId, RepositoryService, RepositorySettings,
    RepositorySnapshot,
};

/// Creates the repository for `app_id` and sets its initial metadata.
///
/// Returns `Ok(None)` without touching anything if the repository already
/// exists. After creation the platform is given `settle_delay_secs` before the
/// repository is edited.
pub async fn provision(
    service: &dyn RepositoryService,
    config: &PromotionConfig,
    app_id: &AppId,
) -> Result<Option<RepositorySnapshot>, PromotionError> {
    let repo = RepositoryId::new(&config.organization, app_id.as_str())
        .ok_or_else(|| {
            PromotionError::invalid_input(format!("{app_id} is not a repository name"))
        })?;

    if service.get_repository(&repo).await?.is_some() {
        tracing::info!(%repo, "repository already exists");
        return Ok(None);
    }

    let created = service.create_repository(&config.organization, app_id).await?;
    tracing::info!(%repo, url = %created.html_url, "created repository");

    tokio::time::sleep(Duration::from_secs(config.settle_delay_secs)).await;

    let settings = RepositorySettings {
        homepage: homepage_url(app_id, config),
        delete_branch_on_merge: true,
    };
    service.edit_repository(&repo, &settings).await?;
    tracing::info!(%repo, homepage = %settings.homepage, "set repository metadata");

    Ok(Some(created))
}
