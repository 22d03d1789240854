//! Publication: push, protect, verify.

use promotion::policy::{protection_rule, push_url};
use promotion::{
    AccessToken, AppId, BranchName, CommitSha, PromotionConfig, PromotionError, ProtectionAttempt,
    PublicationReport, RepositoryId, RepositoryService, SourceControl, UserLogin,
};

use crate::LocalClone;

/// Where the verified clone is published.
#[derive(Debug, Clone)]
pub struct PublishTarget<'a> {
    /// Names the destination repository.
    pub app_id: &'a AppId,
    /// Destination branch.
    pub branch: &'a BranchName,
    /// Commit the destination branch must end up at.
    pub approved: &'a CommitSha,
}

/// Pushes the clone to the destination, locks down its branches and checks
/// that the target branch ended up at the approved commit and protected.
///
/// A failed protection pattern is recorded in the report and does not stop
/// the remaining patterns; only the final verification decides the outcome.
pub async fn publish(
    service: &dyn RepositoryService,
    scm: &dyn SourceControl,
    config: &PromotionConfig,
    token: &AccessToken,
    clone: &LocalClone,
    target: PublishTarget<'_>,
) -> Result<PublicationReport, PromotionError> {
    let repo = RepositoryId::new(&config.organization, target.app_id.as_str()).ok_or_else(|| {
        PromotionError::invalid_input(format!("{} is not a repository name", target.app_id))
    })?;
    let bot = UserLogin::parse(&config.bot_account).ok_or_else(|| {
        PromotionError::invalid_input(format!("{} is not a valid bot account", config.bot_account))
    })?;

    scm.add_remote(clone.path(), &config.remote_name, &push_url(target.app_id, token, config))
        .await?;

    tracing::info!(
        remote = %config.remote_name,
        from = %clone.branch(),
        to = %target.branch,
        "pushing"
    );
    let pushed = scm
        .push(clone.path(), &config.remote_name, clone.branch(), target.branch)
        .await?;
    if !pushed.succeeded() {
        tracing::error!(exit_code = ?pushed.exit_code, output = %pushed.output, "push failed");
        return Err(PromotionError::PushRejected {
            exit_code: pushed.exit_code,
            output: pushed.output,
        });
    }
    tracing::info!(output = %pushed.output, "push succeeded");

    service.remove_collaborator(&repo, &bot).await?;
    tracing::info!(%bot, "removed publishing account from collaborators");

    let report = protect_branches(service, config, &repo).await?;

    let branch = service.get_branch(&repo, target.branch).await?;
    if &branch.head_sha != target.approved {
        tracing::error!(
            remote_head = %branch.head_sha,
            approved = %target.approved,
            "remote HEAD mismatch"
        );
        return Err(PromotionError::RemoteHeadMismatch {
            branch: branch.name,
            remote_head: branch.head_sha,
            approved: target.approved.clone(),
        });
    }
    if !branch.protected {
        tracing::error!(branch = %branch.name, "remote branch is not protected");
        return Err(PromotionError::BranchNotProtected { branch: branch.name });
    }
    tracing::info!(branch = %branch.name, head = %branch.head_sha, "remote branch verified");

    Ok(report)
}

async fn protect_branches(
    service: &dyn RepositoryService,
    config: &PromotionConfig,
    repo: &RepositoryId,
) -> Result<PublicationReport, PromotionError> {
    let node_id = service.repository_node_id(repo).await?;
    let mut report = PublicationReport::default();

    for pattern in config.protected_branches() {
        let rule = protection_rule(pattern.clone(), config);
        let result = match service.create_branch_protection_rule(&node_id, &rule).await {
            Ok(rule_id) => {
                tracing::info!(%pattern, rule_id = %rule_id, "added branch protection rule");
                Ok(rule_id)
            }
            Err(err) => {
                tracing::error!(%pattern, error = %err, "failed to add branch protection rule");
                Err(err.to_string())
            }
        };
        report.protections.push(ProtectionAttempt { pattern, result });
    }
    Ok(report)
}
