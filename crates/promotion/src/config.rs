//! Promotion configuration.
//!
//! Every field has a default matching the Flathub deployment, so an empty
//! configuration file (or none at all) yields a working setup. The binary
//! loads overrides from TOML; this crate only defines the shape and the
//! validation rules.

use serde::{Deserialize, Serialize};

use crate::{BranchName, RepositoryId, TeamSlug, UserLogin};

/// Settings that parameterise the promotion workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromotionConfig {
    /// Organization that owns the intake repository and receives new repositories.
    pub organization: String,
    /// Name of the intake repository within [`Self::organization`].
    pub intake_repository: String,

    /// Team whose members may trigger a promotion, checked first.
    pub admin_team: String,
    /// Team whose members may trigger a promotion.
    pub reviewer_team: String,

    /// Team granted push access on every promoted repository.
    pub base_team: String,
    /// Team granted push access on `org.kde.*` repositories.
    pub kde_team: String,
    /// Team granted push access on top-level `org.gnome.*` repositories.
    pub gnome_team: String,

    /// Account used for publishing, removed from the collaborators afterwards.
    pub bot_account: String,
    /// Name of the git remote pointing at the destination.
    pub remote_name: String,
    /// Host used to build the authenticated push URL.
    pub push_host: String,

    /// Branch patterns protected on every promoted repository.
    pub protected_patterns: Vec<String>,
    /// Status check that must pass before merging into a protected branch.
    pub status_check_context: String,

    /// Homepage template; `{name}` is replaced by the application id.
    pub homepage_template: String,
    /// Delay after repository creation before editing it.
    pub settle_delay_secs: u64,

    /// Label applied to the pull request on closure.
    pub ready_label: String,
    /// Linked from the closing comment.
    pub maintenance_doc_url: String,
    /// Linked from the closing comment.
    pub verification_doc_url: String,
    /// Linked from the closing comment.
    pub blog_url: String,

    /// REST API root.
    pub api_base_url: String,
    /// GraphQL endpoint.
    pub graphql_url: String,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            organization: "flathub".to_string(),
            intake_repository: "flathub".to_string(),
            admin_team: "admins".to_string(),
            reviewer_team: "reviewers".to_string(),
            base_team: "trusted-maintainers".to_string(),
            kde_team: "KDE".to_string(),
            gnome_team: "GNOME".to_string(),
            bot_account: "flathubbot".to_string(),
            remote_name: "flathub".to_string(),
            push_host: "github.com".to_string(),
            protected_patterns: ["master", "main", "stable", "branch/*", "beta", "beta/*"]
                .map(String::from)
                .to_vec(),
            status_check_context: "builds/x86_64".to_string(),
            homepage_template: "https://flathub.org/apps/details/{name}".to_string(),
            settle_delay_secs: 5,
            ready_label: "ready".to_string(),
            maintenance_doc_url: "https://docs.flathub.org/docs/for-app-authors/maintenance"
                .to_string(),
            verification_doc_url: "https://docs.flathub.org/docs/for-app-authors/verification"
                .to_string(),
            blog_url: "https://docs.flathub.org/blog".to_string(),
            api_base_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
        }
    }
}

/// A configuration value failed validation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("invalid configuration: {field}: {reason}")]
pub struct ConfigError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}

impl PromotionConfig {
    /// Checks every field that later steps turn into identifiers or URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let err = |field, reason: &str| ConfigError {
            field,
            reason: reason.to_string(),
        };

        if self.intake().is_none() {
            return Err(err(
                "intake_repository",
                "organization and repository must be non-empty and contain no '/'",
            ));
        }
        for (field, value) in [
            ("admin_team", &self.admin_team),
            ("reviewer_team", &self.reviewer_team),
            ("base_team", &self.base_team),
            ("kde_team", &self.kde_team),
            ("gnome_team", &self.gnome_team),
            ("bot_account", &self.bot_account),
            ("remote_name", &self.remote_name),
            ("push_host", &self.push_host),
            ("status_check_context", &self.status_check_context),
            ("ready_label", &self.ready_label),
        ] {
            if value.trim().is_empty() {
                return Err(err(field, "must not be empty"));
            }
        }
        if UserLogin::parse(&self.bot_account).is_none() {
            return Err(err("bot_account", "must be a valid account login"));
        }
        if self.protected_patterns.is_empty()
            || self.protected_patterns.iter().any(|p| p.is_empty())
        {
            return Err(err("protected_patterns", "must list at least one non-empty pattern"));
        }
        if !self.homepage_template.contains("{name}") {
            return Err(err("homepage_template", "must contain the {name} placeholder"));
        }
        for (field, url) in [
            ("api_base_url", &self.api_base_url),
            ("graphql_url", &self.graphql_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(err(field, "must be an http(s) URL"));
            }
        }
        Ok(())
    }

    /// The intake repository as a [`RepositoryId`].
    pub fn intake(&self) -> Option<RepositoryId> {
        RepositoryId::new(&self.organization, &self.intake_repository)
    }

    /// Protected patterns as branch names, skipping empty entries.
    pub fn protected_branches(&self) -> Vec<BranchName> {
        self.protected_patterns
            .iter()
            .filter_map(|p| BranchName::new(p.as_str()))
            .collect()
    }

    /// [`Self::admin_team`] as a [`TeamSlug`].
    pub fn admin_team(&self) -> Option<TeamSlug> {
        TeamSlug::new(self.admin_team.as_str())
    }

    /// [`Self::reviewer_team`] as a [`TeamSlug`].
    pub fn reviewer_team(&self) -> Option<TeamSlug> {
        TeamSlug::new(self.reviewer_team.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PromotionConfig::default().validate().unwrap();
    }

    #[test]
    fn default_protected_patterns() {
        let branches: Vec<String> = PromotionConfig::default()
            .protected_branches()
            .into_iter()
            .map(|b| b.to_string())
            .collect();
        assert_eq!(branches, ["master", "main", "stable", "branch/*", "beta", "beta/*"]);
    }

    #[test]
    fn homepage_template_needs_placeholder() {
        let config = PromotionConfig {
            homepage_template: "https://example.org".into(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "homepage_template");
    }

    #[test]
    fn intake_repository_must_be_a_single_segment() {
        let config = PromotionConfig {
            intake_repository: "a/b".into(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "intake_repository");
    }

    #[test]
    fn empty_team_is_rejected() {
        let config = PromotionConfig {
            reviewer_team: " ".into(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "reviewer_team");
    }

    #[test]
    fn bot_account_must_be_a_login() {
        let config = PromotionConfig {
            bot_account: "flathub_bot".into(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "bot_account");
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let json = r#"{ "organization": "example", "settle_delay_secs": 0 }"#;
        let config: PromotionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.organization, "example");
        assert_eq!(config.settle_delay_secs, 0);
        assert_eq!(config.base_team, "trusted-maintainers");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<PromotionConfig, _> =
            serde_json::from_str(r#"{ "organisation": "typo" }"#);
        assert!(result.is_err());
    }
}
