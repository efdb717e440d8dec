//! The Asana [`ContextProvider`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::BoxFuture;
use crate::provider::{ContextProvider, IndexedProvider, ProviderError};
use crate::registry::ProviderSetup;
use crate::retry::RetryPolicy;
use crate::secrets::{AccessToken, Environment};
use crate::status::{ProviderState, Status, StatusReport};

use super::client::{AsanaApi, AsanaClient, ApiError, DEFAULT_BASE_URL, TOKEN_ENV_VAR};
use super::fields::FieldMap;
use super::render::render_project;
use super::types::{Page, ProjectRecord, TaskDetail};

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Toronto;

const PROJECT_FIELDS: &[&str] = &[
    "name",
    "created_at",
    "modified_at",
    "owner.name",
    "notes",
    "start_on",
    "due_on",
];

const STORY_FIELDS: &[&str] = &["created_at", "created_by.name", "text"];

/// Placeholder returned by the search stub.
const SEARCH_PLACEHOLDER: &str = "Asana search results";

/// Validated provider settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AsanaSettings {
    pub project_id: String,
    pub fields: FieldMap,
    pub timezone: Tz,
    pub retry: RetryPolicy,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    project_id: Option<toml::Value>,
    fields: Option<toml::Table>,
    timezone: Option<String>,
    retries: Option<i64>,
    retry_delay_ms: Option<u64>,
    base_url: Option<String>,
}

impl AsanaSettings {
    /// Validate a provider settings table. Unknown keys are ignored.
    pub fn from_table(table: &toml::Table) -> Result<Self, ProviderError> {
        let raw: RawSettings = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| ProviderError::config(e.message().to_string()))?;

        let project_id = match raw.project_id {
            Some(toml::Value::String(s)) => s.trim().to_string(),
            Some(toml::Value::Integer(n)) => n.to_string(),
            Some(other) => {
                return Err(ProviderError::config(format!(
                    "project_id: expected a string or integer, got {}",
                    other.type_str()
                )));
            }
            None => String::new(),
        };
        if project_id.is_empty() {
            return Err(ProviderError::config(
                "Asana project ID is not set; add project_id to the provider's configuration",
            ));
        }

        let fields = match raw.fields {
            Some(table) => FieldMap::from_table(&table)?,
            None => FieldMap::default(),
        };

        let timezone = match raw.timezone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ProviderError::config(format!("unknown timezone {name:?}")))?,
            None => DEFAULT_TIMEZONE,
        };

        let defaults = RetryPolicy::default();
        let max_attempts = match raw.retries {
            Some(n) if n < 1 => {
                return Err(ProviderError::config(format!(
                    "retries must be at least 1, got {n}"
                )));
            }
            Some(n) => u32::try_from(n)
                .map_err(|_| ProviderError::config(format!("retries is too large: {n}")))?,
            None => defaults.max_attempts,
        };
        let delay = raw
            .retry_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.delay);

        Ok(Self {
            project_id,
            fields,
            timezone,
            retry: RetryPolicy::new(max_attempts, delay),
            base_url: raw.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

fn require_token(env: &Environment) -> Result<AccessToken, ProviderError> {
    env.token(TOKEN_ENV_VAR).ok_or_else(|| {
        ProviderError::config(format!(
            "Asana personal access token is not set; define {TOKEN_ENV_VAR} in the environment or .env file"
        ))
    })
}

/// Context provider for a single Asana project.
pub struct AsanaProvider {
    name: String,
    settings: AsanaSettings,
    api: Arc<dyn AsanaApi>,
    state: ProviderState,
    fetch_guard: tokio::sync::Mutex<()>,
}

impl AsanaProvider {
    pub fn new(name: impl Into<String>, settings: AsanaSettings, api: Arc<dyn AsanaApi>) -> Self {
        Self {
            name: name.into(),
            settings,
            api,
            state: ProviderState::new(),
            fetch_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Build from configuration, talking to the Asana REST API.
    ///
    /// Fails with a configuration error when the access token is missing or
    /// the settings are invalid.
    pub fn from_setup(setup: ProviderSetup<'_>) -> Result<Self, ProviderError> {
        let token = require_token(setup.env)?;
        let settings = AsanaSettings::from_table(&setup.settings)?;
        let client = AsanaClient::new(token)
            .map_err(|e| ProviderError::config(format!("failed to build HTTP client: {e}")))?
            .with_base_url(settings.base_url.clone());
        Ok(Self::new(setup.name, settings, Arc::new(client)))
    }

    /// Like [`from_setup`](Self::from_setup), with an injected API.
    ///
    /// The access token is still required.
    pub fn from_setup_with_api(
        setup: ProviderSetup<'_>,
        api: Arc<dyn AsanaApi>,
    ) -> Result<Self, ProviderError> {
        require_token(setup.env)?;
        let settings = AsanaSettings::from_table(&setup.settings)?;
        Ok(Self::new(setup.name, settings, api))
    }

    pub fn settings(&self) -> &AsanaSettings {
        &self.settings
    }

    /// Run one API call under the retry policy.
    async fn call<T, F, Fut>(&self, call: &'static str, op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        debug!(provider = %self.name, call, "Asana API call");
        self.settings
            .retry
            .run(call, op)
            .await
            .map_err(|e| ProviderError::Api {
                call,
                attempts: e.attempts,
                source: Box::new(e.source),
            })
    }

    /// Follow `next_page` offsets until the listing is exhausted.
    async fn all_pages<'a, T, F>(&self, call: &'static str, fetch_page: F) -> Result<Vec<T>, ProviderError>
    where
        F: Fn(Option<String>) -> BoxFuture<'a, Result<Page<T>, ApiError>>,
    {
        let mut items = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let page = self.call(call, || fetch_page(offset.clone())).await?;
            let next = page.next_offset().map(str::to_string);
            items.extend(page.data);
            match next {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(items)
    }

    /// Fetch and render. `Ok(None)` when the project does not exist.
    async fn collect(&self) -> Result<Option<String>, ProviderError> {
        let api = self.api.as_ref();
        let project_id = self.settings.project_id.as_str();
        let project_fields: Vec<String> = PROJECT_FIELDS.iter().map(|f| f.to_string()).collect();
        let story_fields: Vec<String> = STORY_FIELDS.iter().map(|f| f.to_string()).collect();
        let task_fields = self.settings.fields.opt_fields();

        let project: Option<ProjectRecord> = self
            .call("get_project", || api.get_project(project_id, &project_fields))
            .await?;
        let Some(project) = project else {
            return Ok(None);
        };

        let summaries = self
            .all_pages("get_tasks_for_project", |offset| {
                api.get_tasks_for_project(project_id, &task_fields, offset)
            })
            .await?;
        debug!(provider = %self.name, tasks = summaries.len(), "Listed project tasks");

        let mut tasks = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let Some(gid) = summary.gid().map(str::to_string) else {
                warn!(provider = %self.name, "Skipping task without gid");
                continue;
            };
            let record = self
                .call("get_task", || api.get_task(&gid, &task_fields))
                .await?;
            let stories = self
                .all_pages("get_stories_for_task", |offset| {
                    api.get_stories_for_task(&gid, &story_fields, offset)
                })
                .await?;
            tasks.push(TaskDetail { record, stories });
        }

        Ok(Some(render_project(
            &project,
            &tasks,
            &self.settings.fields,
            self.settings.timezone,
        )))
    }
}

impl ContextProvider for AsanaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    /// Every fetch is a full fetch; `full_fetch` is accepted for interface
    /// compatibility.
    fn fetch_context(&self, _full_fetch: bool) -> BoxFuture<'_, Result<(), ProviderError>> {
        Box::pin(async move {
            let Ok(_guard) = self.fetch_guard.try_lock() else {
                return Err(ProviderError::FetchInProgress(self.name.clone()));
            };

            let attempt = self.state.begin_fetch();
            info!(provider = %self.name, project = %self.settings.project_id, "Fetching Asana context");

            match self.collect().await {
                Ok(Some(text)) => {
                    info!(provider = %self.name, bytes = text.len(), "Asana context is fresh");
                    attempt.succeed(text);
                    Ok(())
                }
                Ok(None) => {
                    warn!(
                        provider = %self.name,
                        project = %self.settings.project_id,
                        "Asana project not found, context left stale"
                    );
                    attempt.fail();
                    Ok(())
                }
                Err(err) => {
                    warn!(provider = %self.name, error = %err, "Asana fetch failed");
                    attempt.fail();
                    Err(err)
                }
            }
        })
    }

    fn get_context(&self) -> Option<String> {
        self.state.context()
    }

    fn report_status(&self) -> StatusReport {
        self.state.report()
    }

    fn as_indexed(&self) -> Option<&dyn IndexedProvider> {
        Some(self)
    }
}

impl IndexedProvider for AsanaProvider {
    fn index_context(&self) -> BoxFuture<'_, Result<(), ProviderError>> {
        Box::pin(async move {
            // Indexing does not refresh the text, so the fetch status stands.
            let previous = self.state.status();
            self.state.update_status(Status::Indexing);
            debug!(provider = %self.name, "Indexing Asana context");
            self.state.update_status(previous);
            Ok(())
        })
    }

    fn search_index(&self, query: &str) -> BoxFuture<'_, Result<String, ProviderError>> {
        debug!(provider = %self.name, query, "Searching Asana index");
        Box::pin(async { Ok(SEARCH_PLACEHOLDER.to_string()) })
    }

    fn load_from_index(&self, results: String) {
        self.state.replace_context(results);
    }
}
