//! Per-provider configuration sections.
//!
//! Each `[context_providers.<name>]` table carries an `enabled` flag and an
//! open set of provider-specific keys. The sections keep the order in which
//! they were declared, which is also the default order of batch operations.
//!
//! ## TOML Example
//!
//! ```toml
//! [context_providers.asana]
//! enabled = true
//! project_id = "1204567890"
//! timezone = "America/Toronto"
//!
//! [context_providers.asana.fields]
//! Task = "name"
//! "Due On" = "due_on"
//! ```

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Configuration for a single provider.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Whether the manager should construct this provider.
    pub enabled: bool,

    /// Every key of the section except `enabled`, in declaration order.
    pub settings: toml::Table,
}

impl ProviderConfig {
    /// Build a provider section from its raw TOML table.
    pub fn from_table(mut table: toml::Table) -> Result<Self, String> {
        let enabled = match table.remove("enabled") {
            None => false,
            Some(toml::Value::Boolean(b)) => b,
            Some(other) => {
                return Err(format!(
                    "`enabled` must be a boolean, got {}",
                    other.type_str()
                ));
            }
        };
        Ok(Self {
            enabled,
            settings: table,
        })
    }

    /// A copy of this provider's settings with `global` merged in.
    ///
    /// Global keys only fill gaps; anything the provider declares itself is
    /// left untouched. The source config is never modified.
    pub fn resolved_settings(&self, global: &toml::Table) -> toml::Table {
        let mut merged = self.settings.clone();
        for (key, value) in global {
            if !merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

impl Serialize for ProviderConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.settings.len() + 1))?;
        map.serialize_entry("enabled", &self.enabled)?;
        for (key, value) in &self.settings {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// All provider sections, in declaration order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProviderConfigs {
    entries: Vec<(String, ProviderConfig)>,
}

impl ProviderConfigs {
    /// Create an empty set of provider sections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section, replacing any existing one with the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, config: ProviderConfig) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = config,
            None => self.entries.push((name, config)),
        }
    }

    /// Look up a section by provider name.
    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, config)| config)
    }

    /// Iterate over `(name, section)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderConfig)> {
        self.entries
            .iter()
            .map(|(name, config)| (name.as_str(), config))
    }

    /// Provider names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ProviderConfigs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, config) in &self.entries {
            map.serialize_entry(name, config)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProviderConfigs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = toml::Table::deserialize(deserializer)?;
        let mut configs = Self::new();
        for (name, value) in raw {
            let table = match value {
                toml::Value::Table(table) => table,
                other => {
                    return Err(de::Error::custom(SectionError {
                        name: &name,
                        reason: format!("expected a table, got {}", other.type_str()),
                    }));
                }
            };
            let config = ProviderConfig::from_table(table)
                .map_err(|reason| de::Error::custom(SectionError { name: &name, reason }))?;
            configs.insert(name, config);
        }
        Ok(configs)
    }
}

struct SectionError<'a> {
    name: &'a str,
    reason: String,
}

impl fmt::Display for SectionError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context_providers.{}: {}", self.name, self.reason)
    }
}
