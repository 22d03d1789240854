//! Configuration file loading.

use std::path::Path;

use anyhow::Context;
use promotion::PromotionConfig;

/// Loads and validates the configuration.
///
/// Without a path every field takes its default. With a path, the TOML file
/// overrides the fields it names.
pub fn load(path: Option<&Path>) -> anyhow::Result<PromotionConfig> {
    let config = match path {
        None => PromotionConfig::default(),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn no_file_means_defaults() {
        assert_eq!(load(None).unwrap(), PromotionConfig::default());
    }

    #[test]
    fn file_overrides_named_fields() {
        let file = write(
            r#"
            organization = "example"
            settle_delay_secs = 1
            protected_patterns = ["main"]
            "#,
        );
        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.organization, "example");
        assert_eq!(config.settle_delay_secs, 1);
        assert_eq!(config.protected_patterns, vec!["main".to_string()]);
        assert_eq!(config.bot_account, "flathubbot");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let file = write(r#"homepage_template = "https://example.org""#);
        let err = load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("homepage_template"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write(r#"organisation = "typo""#);
        assert!(load(Some(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("promoter.toml"))).is_err());
    }
}
