//! A scripted, in-memory [`AsanaApi`].
//!
//! [`FakeAsanaApi`] serves one project and its tasks, counts every call by
//! kind, and replays queued failures before answering normally. Share it
//! through an `Arc` so a test can keep inspecting it after handing it to a
//! provider.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use llmctx_core::BoxFuture;
use llmctx_core::asana::{
    AsanaApi, AsanaProvider, AsanaSettings, ApiError, NextPage, Page, ProjectRecord, StoryRecord,
    TaskRecord, TOKEN_ENV_VAR, UserRef,
};
use llmctx_core::{Environment, ProviderRegistry};
use serde_json::json;

/// The API call kinds, for counting and failure scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    GetProject,
    GetTasksForProject,
    GetTask,
    GetStoriesForTask,
}

#[derive(Default)]
struct Script {
    calls: HashMap<Call, u32>,
    failures: HashMap<Call, VecDeque<ApiError>>,
    opt_fields: HashMap<Call, Vec<String>>,
}

/// In-memory Asana API with scripted failures.
pub struct FakeAsanaApi {
    project: Option<ProjectRecord>,
    tasks: Vec<(TaskRecord, Vec<StoryRecord>)>,
    page_size: Option<usize>,
    latency: Duration,
    script: Mutex<Script>,
}

impl FakeAsanaApi {
    /// An API where the project does not exist (every project lookup 404s).
    pub fn new() -> Self {
        Self {
            project: None,
            tasks: Vec::new(),
            page_size: None,
            latency: Duration::ZERO,
            script: Mutex::new(Script::default()),
        }
    }

    pub fn with_project(mut self, project: ProjectRecord) -> Self {
        self.project = Some(project);
        self
    }

    /// Append a task; tasks are listed in insertion order.
    pub fn with_task(mut self, task: TaskRecord, stories: Vec<StoryRecord>) -> Self {
        self.tasks.push((task, stories));
        self
    }

    /// Split list responses into pages of `size` items.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    /// Sleep this long inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next `times` calls of kind `call` fail with `error`.
    pub fn fail_next(&self, call: Call, times: u32, error: ApiError) {
        let mut script = self.script.lock().expect("fake script poisoned");
        let queue = script.failures.entry(call).or_default();
        for _ in 0..times {
            queue.push_back(error.clone());
        }
    }

    /// Make the next `times` calls of kind `call` answer 503.
    pub fn fail_busy(&self, call: Call, times: u32) {
        self.fail_next(call, times, ApiError::service_unavailable());
    }

    /// How many times `call` was made.
    pub fn calls(&self, call: Call) -> u32 {
        let script = self.script.lock().expect("fake script poisoned");
        script.calls.get(&call).copied().unwrap_or(0)
    }

    /// Total calls across all kinds.
    pub fn total_calls(&self) -> u32 {
        let script = self.script.lock().expect("fake script poisoned");
        script.calls.values().sum()
    }

    /// The `opt_fields` sent with the most recent `call`.
    pub fn last_opt_fields(&self, call: Call) -> Vec<String> {
        let script = self.script.lock().expect("fake script poisoned");
        script.opt_fields.get(&call).cloned().unwrap_or_default()
    }

    /// Count the call, wait out the latency, then replay a queued failure.
    async fn enter(&self, call: Call, opt_fields: &[String]) -> Result<(), ApiError> {
        let failure = {
            let mut script = self.script.lock().expect("fake script poisoned");
            *script.calls.entry(call).or_insert(0) += 1;
            script.opt_fields.insert(call, opt_fields.to_vec());
            script.failures.get_mut(&call).and_then(VecDeque::pop_front)
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn paginate<T: Clone>(&self, items: &[T], offset: Option<String>) -> Page<T> {
        let start: usize = offset
            .as_deref()
            .map(|o| o.parse().expect("fake offsets are indexes"))
            .unwrap_or(0);
        let size = self.page_size.unwrap_or(usize::MAX);
        let end = start.saturating_add(size).min(items.len());
        let next_page = (end < items.len()).then(|| NextPage {
            offset: end.to_string(),
        });
        Page {
            data: items[start.min(end)..end].to_vec(),
            next_page,
        }
    }

    fn find_task(&self, gid: &str) -> Option<&(TaskRecord, Vec<StoryRecord>)> {
        self.tasks.iter().find(|(task, _)| task.gid() == Some(gid))
    }
}

impl Default for FakeAsanaApi {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("{what} not found"),
    }
}

impl AsanaApi for FakeAsanaApi {
    fn get_project<'a>(
        &'a self,
        _project_gid: &'a str,
        opt_fields: &'a [String],
    ) -> BoxFuture<'a, Result<Option<ProjectRecord>, ApiError>> {
        Box::pin(async move {
            self.enter(Call::GetProject, opt_fields).await?;
            Ok(self.project.clone())
        })
    }

    fn get_tasks_for_project<'a>(
        &'a self,
        project_gid: &'a str,
        opt_fields: &'a [String],
        offset: Option<String>,
    ) -> BoxFuture<'a, Result<Page<TaskRecord>, ApiError>> {
        Box::pin(async move {
            self.enter(Call::GetTasksForProject, opt_fields).await?;
            if self.project.is_none() {
                return Err(not_found(project_gid));
            }
            let summaries: Vec<TaskRecord> = self
                .tasks
                .iter()
                .map(|(task, _)| {
                    TaskRecord::from(json!({"gid": task.gid(), "name": task.name()}))
                })
                .collect();
            Ok(self.paginate(&summaries, offset))
        })
    }

    fn get_task<'a>(
        &'a self,
        task_gid: &'a str,
        opt_fields: &'a [String],
    ) -> BoxFuture<'a, Result<TaskRecord, ApiError>> {
        Box::pin(async move {
            self.enter(Call::GetTask, opt_fields).await?;
            self.find_task(task_gid)
                .map(|(task, _)| task.clone())
                .ok_or_else(|| not_found(task_gid))
        })
    }

    fn get_stories_for_task<'a>(
        &'a self,
        task_gid: &'a str,
        opt_fields: &'a [String],
        offset: Option<String>,
    ) -> BoxFuture<'a, Result<Page<StoryRecord>, ApiError>> {
        Box::pin(async move {
            self.enter(Call::GetStoriesForTask, opt_fields).await?;
            let (_, stories) = self.find_task(task_gid).ok_or_else(|| not_found(task_gid))?;
            Ok(self.paginate(stories, offset))
        })
    }
}

/// A project record with the given gid and name.
pub fn project(gid: &str, name: &str) -> ProjectRecord {
    ProjectRecord {
        gid: gid.to_string(),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

/// A task record with the given gid and name.
pub fn task(gid: &str, name: &str) -> TaskRecord {
    TaskRecord::from(json!({"gid": gid, "name": name}))
}

/// A story written by `author` at `created_at`.
pub fn story(author: &str, created_at: &str, text: &str) -> StoryRecord {
    StoryRecord {
        gid: format!("story-{created_at}"),
        created_at: Some(created_at.to_string()),
        created_by: Some(UserRef {
            gid: None,
            name: Some(author.to_string()),
        }),
        text: Some(text.to_string()),
    }
}

/// An environment holding a dummy Asana token.
pub fn test_env() -> Environment {
    Environment::empty().with_var(TOKEN_ENV_VAR, "test-token")
}

/// An Asana provider named `asana` over `api`, with settings given as TOML.
///
/// Retries default to no delay so busy-response tests run instantly.
pub fn asana_provider(api: Arc<FakeAsanaApi>, settings_toml: &str) -> AsanaProvider {
    let mut table: toml::Table = toml::from_str(settings_toml).expect("invalid settings TOML");
    table
        .entry("retry_delay_ms")
        .or_insert(toml::Value::Integer(0));
    let settings = AsanaSettings::from_table(&table).expect("invalid Asana settings");
    AsanaProvider::new("asana", settings, api)
}

/// A registry whose `asana` factory builds providers over `api`.
pub fn registry_with_fake(api: Arc<FakeAsanaApi>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register("asana", move |setup| {
        let provider: Box<dyn llmctx_core::ContextProvider> =
            Box::new(AsanaProvider::from_setup_with_api(setup, api.clone())?);
        Ok(provider)
    });
    registry
}
