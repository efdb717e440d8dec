//! Asana task-tracker provider.
//!
//! Fetches one project, its tasks and every task's story history, and
//! renders them as Markdown. Configuration lives under
//! `[context_providers.asana]`; the access token is read from
//! `ASANA_PERSONAL_ACCESS_TOKEN`.

pub mod client;
pub mod fields;
pub mod provider;
pub mod render;
pub mod types;

pub use client::{AsanaApi, AsanaClient, ApiError, TOKEN_ENV_VAR};
pub use fields::FieldMap;
pub use provider::{AsanaProvider, AsanaSettings};
pub use types::{NextPage, Page, ProjectRecord, StoryRecord, TaskRecord, UserRef};

use crate::provider::ContextProvider;
use crate::registry::ProviderRegistry;

/// Registry name of the Asana provider type.
pub const PROVIDER_NAME: &str = "asana";

/// Register the Asana factory under [`PROVIDER_NAME`].
pub fn register(registry: &mut ProviderRegistry) {
    registry.register(PROVIDER_NAME, |setup| {
        let provider: Box<dyn ContextProvider> = Box::new(AsanaProvider::from_setup(setup)?);
        Ok(provider)
    });
}
