//! Provider registry: maps configuration names to provider factories.
//!
//! The registry is an ordinary value built at startup: call
//! [`ProviderRegistry::with_builtin_providers`] for everything shipped with
//! this crate, then [`register`](ProviderRegistry::register) any extra
//! factories (tests register fakes the same way). A configuration section
//! named `asana` is built by the factory registered as `asana`; there is no
//! name mangling.

use std::collections::HashMap;

use crate::provider::{ContextProvider, ProviderError};
use crate::secrets::Environment;

/// Everything a factory receives to build one provider.
#[derive(Debug)]
pub struct ProviderSetup<'a> {
    /// The configuration name of the provider.
    pub name: &'a str,
    /// An owned copy of the provider's settings, global keys merged in.
    pub settings: toml::Table,
    /// Environment to read credentials from.
    pub env: &'a Environment,
}

/// A provider constructor.
pub type ProviderFactory =
    dyn Fn(ProviderSetup<'_>) -> Result<Box<dyn ContextProvider>, ProviderError> + Send + Sync;

/// Registry of provider factories.
pub struct ProviderRegistry {
    factories: HashMap<String, Box<ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding every provider type this crate ships.
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        crate::asana::register(&mut registry);
        registry
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(ProviderSetup<'_>) -> Result<Box<dyn ContextProvider>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// The factory registered under `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&ProviderFactory> {
        self.factories.get(name).map(|factory| factory.as_ref())
    }

    /// Whether a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a provider with the factory registered under `setup.name`.
    ///
    /// Returns [`ProviderError::Unregistered`] on a lookup miss.
    pub fn build(&self, setup: ProviderSetup<'_>) -> Result<Box<dyn ContextProvider>, ProviderError> {
        match self.lookup(setup.name) {
            Some(factory) => factory(setup),
            None => Err(ProviderError::Unregistered(setup.name.to_string())),
        }
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxFuture;
    use crate::status::{ProviderState, StatusReport};

    struct NullProvider {
        name: String,
        state: ProviderState,
    }

    impl ContextProvider for NullProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn fetch_context(&self, _full_fetch: bool) -> BoxFuture<'_, Result<(), ProviderError>> {
            Box::pin(async { Ok(()) })
        }

        fn get_context(&self) -> Option<String> {
            None
        }

        fn report_status(&self) -> StatusReport {
            self.state.report()
        }
    }

    fn null_factory(
        setup: ProviderSetup<'_>,
    ) -> Result<Box<dyn ContextProvider>, ProviderError> {
        Ok(Box::new(NullProvider {
            name: setup.name.to_string(),
            state: ProviderState::new(),
        }))
    }

    fn setup<'a>(name: &'a str, env: &'a Environment) -> ProviderSetup<'a> {
        ProviderSetup {
            name,
            settings: toml::Table::new(),
            env,
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.names().is_empty());
        assert!(!registry.contains("asana"));
    }

    #[test]
    fn test_register_and_build() {
        let mut registry = ProviderRegistry::new();
        registry.register("null", null_factory);
        let env = Environment::empty();

        let provider = registry.build(setup("null", &env)).unwrap();
        assert_eq!(provider.name(), "null");
    }

    #[test]
    fn test_lookup() {
        let mut registry = ProviderRegistry::new();
        registry.register("null", null_factory);
        let env = Environment::empty();

        let factory = registry.lookup("null").unwrap();
        assert_eq!(factory(setup("null", &env)).unwrap().name(), "null");
        assert!(registry.lookup("jira").is_none());
    }

    #[test]
    fn test_lookup_miss_is_an_error_not_a_panic() {
        let registry = ProviderRegistry::new();
        let env = Environment::empty();
        let err = registry.build(setup("jira", &env)).err().unwrap();
        assert!(matches!(err, ProviderError::Unregistered(ref name) if name == "jira"));
    }

    #[test]
    fn test_builtin_providers() {
        let registry = ProviderRegistry::with_builtin_providers();
        assert_eq!(registry.names(), vec!["asana"]);
    }

    #[test]
    fn test_factory_errors_propagate() {
        let mut registry = ProviderRegistry::new();
        registry.register("broken", |_setup| Err(ProviderError::config("nope")));
        let env = Environment::empty();
        let err = registry.build(setup("broken", &env)).err().unwrap();
        assert!(err.is_config());
    }
}
