//! Batch operations over the configured providers.
//!
//! The [`ContextManager`] owns every provider built from configuration, in
//! configuration order. Each batch operation takes an optional selection of
//! provider names, visited in the order given: `None` or an empty slice
//! means all providers in configuration order, and names that were not built
//! are ignored.

use std::collections::BTreeMap;

use llmctx_config::AppConfig;
use tracing::{debug, info, warn};

use crate::provider::{ContextProvider, ProviderError};
use crate::registry::{ProviderRegistry, ProviderSetup};
use crate::secrets::Environment;
use crate::status::StatusReport;

/// A configured provider that was not built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedProvider {
    pub name: String,
    pub reason: String,
}

/// A provider fetch that failed during a batch.
#[derive(Debug)]
pub struct FetchFailure {
    pub provider: String,
    pub error: ProviderError,
}

/// Owns the enabled providers and runs batch operations across them.
pub struct ContextManager {
    providers: Vec<Box<dyn ContextProvider>>,
    skipped: Vec<SkippedProvider>,
}

impl ContextManager {
    /// Build every enabled provider in `config`.
    ///
    /// Disabled entries are never constructed. Entries with no registered
    /// factory, or whose factory fails, are logged and recorded in
    /// [`skipped`](Self::skipped); the remaining entries still build.
    pub fn new(config: &AppConfig, registry: &ProviderRegistry, env: &Environment) -> Self {
        let mut providers: Vec<Box<dyn ContextProvider>> = Vec::new();
        let mut skipped = Vec::new();

        for (name, entry) in config.context_providers.iter() {
            if !entry.enabled {
                debug!(provider = name, "Provider disabled, not constructing");
                continue;
            }
            let setup = ProviderSetup {
                name,
                settings: entry.resolved_settings(&config.global),
                env,
            };
            match registry.build(setup) {
                Ok(provider) => {
                    info!(provider = name, "Provider constructed");
                    providers.push(provider);
                }
                Err(err) => {
                    warn!(provider = name, error = %err, "Skipping provider");
                    skipped.push(SkippedProvider {
                        name: name.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Self { providers, skipped }
    }

    /// Wrap already-built providers, keeping their order.
    pub fn from_providers(providers: Vec<Box<dyn ContextProvider>>) -> Self {
        Self {
            providers,
            skipped: Vec::new(),
        }
    }

    /// Names of the constructed providers, in configuration order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn provider(&self, name: &str) -> Option<&dyn ContextProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Configured providers that were not constructed.
    pub fn skipped(&self) -> &[SkippedProvider] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The selected providers, in the order given. Without a selection,
    /// every provider in configuration order.
    fn selected<'a>(&'a self, selection: Option<&[&str]>) -> Vec<&'a dyn ContextProvider> {
        match selection.filter(|names| !names.is_empty()) {
            Some(names) => names.iter().filter_map(|name| self.provider(name)).collect(),
            None => self.providers.iter().map(|p| p.as_ref()).collect(),
        }
    }

    /// Fetch the selected providers one after another.
    ///
    /// A failing provider never stops the batch; its error is logged and
    /// returned in the failure list.
    pub async fn fetch_contexts(&self, selection: Option<&[&str]>) -> Vec<FetchFailure> {
        let targets = self.selected(selection);
        info!(providers = targets.len(), "Fetching contexts");
        let mut failures = Vec::new();
        for provider in targets {
            let result = provider.fetch_context(false).await;
            record(provider, result, &mut failures);
        }
        failures
    }

    /// Blocking variant of [`fetch_contexts`](Self::fetch_contexts).
    ///
    /// Each provider runs through its blocking entry point, so calling this
    /// from inside an async runtime yields one failure per provider.
    pub fn fetch_contexts_blocking(&self, selection: Option<&[&str]>) -> Vec<FetchFailure> {
        let targets = self.selected(selection);
        info!(providers = targets.len(), "Fetching contexts (blocking)");
        let mut failures = Vec::new();
        for provider in targets {
            let result = provider.fetch_context_blocking(false);
            record(provider, result, &mut failures);
        }
        failures
    }

    /// Concatenate the rendered text of the selected providers, each
    /// followed by a newline. Providers without text are skipped.
    pub fn get_combined_context(&self, selection: Option<&[&str]>) -> String {
        let mut combined = String::new();
        for provider in self.selected(selection) {
            if let Some(text) = provider.get_context().filter(|t| !t.is_empty()) {
                combined.push_str(&text);
                combined.push('\n');
            }
        }
        combined
    }

    /// Status snapshot per selected provider.
    pub fn get_status(&self, selection: Option<&[&str]>) -> BTreeMap<String, StatusReport> {
        self.selected(selection)
            .into_iter()
            .map(|p| (p.name().to_string(), p.report_status()))
            .collect()
    }
}

fn record(
    provider: &dyn ContextProvider,
    result: Result<(), ProviderError>,
    failures: &mut Vec<FetchFailure>,
) {
    match result {
        Ok(()) => debug!(provider = provider.name(), "Fetch finished"),
        Err(error) => {
            warn!(provider = provider.name(), error = %error, "Error in context provider");
            failures.push(FetchFailure {
                provider: provider.name().to_string(),
                error,
            });
        }
    }
}
