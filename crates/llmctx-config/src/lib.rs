#![deny(unsafe_code)]

//! Configuration loading and validation for llmctx.
//!
//! Loads TOML configuration files and validates them before any provider is
//! constructed. [`AppConfig`] is the central configuration structure; the
//! [`providers`] module holds the ordered, per-provider sections.

/// Ordered `[context_providers.*]` sections.
pub mod providers;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use providers::{ProviderConfig, ProviderConfigs};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Settings shared by every provider.
    ///
    /// Merged into each provider's own settings at construction time; keys
    /// the provider sets itself take precedence.
    #[serde(default)]
    pub global: toml::Table,

    /// Provider sections, in declaration order.
    #[serde(default)]
    pub context_providers: ProviderConfigs,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            providers = config.context_providers.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                VALID_LOG_LEVELS, self.logging.level
            )));
        }

        for (name, _) in self.context_providers.iter() {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "context_providers keys must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Settings for the named provider with `[global]` merged in.
    ///
    /// Returns `None` when no provider of that name is configured.
    pub fn provider_settings(&self, name: &str) -> Option<toml::Table> {
        self.context_providers
            .get(name)
            .map(|provider| provider.resolved_settings(&self.global))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.global.is_empty());
        assert!(config.context_providers.is_empty());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.context_providers.is_empty());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [logging]
            level = "debug"

            [global]
            timezone = "Europe/Paris"

            [context_providers.asana]
            enabled = true
            project_id = "1204567890"

            [context_providers.asana.fields]
            Task = "name"
            Assignee = "assignee"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.global.get("timezone").and_then(|v| v.as_str()),
            Some("Europe/Paris")
        );

        let asana = config.context_providers.get("asana").unwrap();
        assert!(asana.enabled);
        assert_eq!(
            asana.settings.get("project_id").and_then(|v| v.as_str()),
            Some("1204567890")
        );
        assert!(!asana.settings.contains_key("enabled"));
    }

    #[test]
    fn test_provider_declaration_order_preserved() {
        let toml = r#"
            [context_providers.zeta]
            enabled = true

            [context_providers.alpha]
            enabled = false

            [context_providers.mid]
            enabled = true
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.context_providers.names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_field_order_preserved() {
        let toml = r#"
            [context_providers.asana.fields]
            Zulu = "z"
            Alpha = "a"
            Mike = "m"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        let fields = config
            .context_providers
            .get("asana")
            .and_then(|p| p.settings.get("fields"))
            .and_then(|v| v.as_table())
            .unwrap();
        let labels: Vec<&str> = fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(labels, vec!["Zulu", "Alpha", "Mike"]);
    }

    #[test]
    fn test_missing_enabled_defaults_to_false() {
        let toml = r#"
            [context_providers.asana]
            project_id = "1"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert!(!config.context_providers.get("asana").unwrap().enabled);
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let toml = r#"
            [logging]
            level = "loud"
        "#;
        let result = AppConfig::parse(toml);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_non_boolean_enabled() {
        let toml = r#"
            [context_providers.asana]
            enabled = "yes"
        "#;
        let result = AppConfig::parse(toml);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_rejects_non_table_provider() {
        let toml = r#"
            [context_providers]
            asana = true
        "#;
        let result = AppConfig::parse(toml);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_rejects_empty_provider_name() {
        let toml = r#"
            [context_providers.""]
            enabled = true
        "#;
        let result = AppConfig::parse(toml);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_provider_settings_merges_global() {
        let toml = r#"
            [global]
            timezone = "Europe/Paris"
            retries = 5

            [context_providers.asana]
            enabled = true
            project_id = "P1"
            retries = 2
        "#;
        let config = AppConfig::parse(toml).unwrap();
        let settings = config.provider_settings("asana").unwrap();
        assert_eq!(
            settings.get("timezone").and_then(|v| v.as_str()),
            Some("Europe/Paris")
        );
        // Provider-specific keys win over global ones.
        assert_eq!(
            settings.get("retries").and_then(|v| v.as_integer()),
            Some(2)
        );
        assert!(config.provider_settings("jira").is_none());
    }

    #[test]
    fn test_serialize_roundtrip_keeps_sections() {
        let toml_src = r#"
            [context_providers.asana]
            enabled = true
            project_id = "P1"
        "#;
        let config = AppConfig::parse(toml_src).unwrap();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let reparsed = AppConfig::parse(&rendered).unwrap();
        let asana = reparsed.context_providers.get("asana").unwrap();
        assert!(asana.enabled);
        assert_eq!(
            asana.settings.get("project_id").and_then(|v| v.as_str()),
            Some("P1")
        );
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[test_log::test(tokio::test)]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("llmctx.toml");
        tokio::fs::write(
            &path,
            b"[logging]\nlevel = \"warn\"\n\n[context_providers.asana]\nenabled = true\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.logging.level, "warn");
        assert!(config.context_providers.get("asana").unwrap().enabled);
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/file.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[")
            .await
            .unwrap();

        let result = AppConfig::load(&path).await;
        assert!(result.is_err());
    }

    // ── Error display ─────────────────────────────────────────────────

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }
}
