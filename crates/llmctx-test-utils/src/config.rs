//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries, and [`TempConfigFile`] when
//! the code under test reads configuration from disk.

use std::path::{Path, PathBuf};

use llmctx_config::{AppConfig, ProviderConfig};
use tempfile::TempDir;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .provider("asana", true, r#"project_id = "P1""#)
///     .global("timezone", "UTC")
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Add a `[global]` key.
    pub fn global(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.config.global.insert(key.to_string(), value.into());
        self
    }

    /// Add a `[context_providers.<name>]` section whose settings are given
    /// as TOML source (without the `enabled` key).
    pub fn provider(mut self, name: &str, enabled: bool, settings_toml: &str) -> Self {
        let settings: toml::Table =
            toml::from_str(settings_toml).expect("invalid provider settings TOML in test");
        self.config
            .context_providers
            .insert(name, ProviderConfig { enabled, settings });
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }

    /// Serialize the built configuration back to TOML source.
    pub fn to_toml(self) -> String {
        toml::to_string(&self.config).expect("test config must serialize")
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A config file in a temporary directory, deleted on drop.
pub struct TempConfigFile {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TempConfigFile {
    /// Write `toml_content` to `llmctx.toml` in a fresh temp directory.
    pub async fn with_toml(toml_content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("llmctx.toml");
        tokio::fs::write(&path, toml_content)
            .await
            .expect("failed to write test config");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the file through [`AppConfig::load`].
    pub async fn load(&self) -> AppConfig {
        AppConfig::load(&self.path)
            .await
            .expect("failed to parse test config")
    }
}
