//! Asana REST client.
//!
//! [`AsanaApi`] is the seam the provider talks through: [`AsanaClient`]
//! implements it over HTTP with `reqwest`, tests implement it with scripted
//! responses. List endpoints return one [`Page`] per call so that retries
//! apply to individual pages, not whole listings.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::BoxFuture;
use crate::retry::Transient;
use crate::secrets::AccessToken;

use super::types::{Envelope, Page, ProjectRecord, StoryRecord, TaskRecord};

pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";

/// Environment variable holding the personal access token.
pub const TOKEN_ENV_VAR: &str = "ASANA_PERSONAL_ACCESS_TOKEN";

/// Page size for list endpoints (the API maximum).
pub const PAGE_LIMIT: u32 = 100;

/// Errors from individual Asana API calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("response parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// `503 Service Unavailable`.
    pub fn service_unavailable() -> Self {
        Self::Status {
            status: 503,
            message: "Service Unavailable".to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl Transient for ApiError {
    fn is_transient(&self) -> bool {
        self.status() == Some(StatusCode::SERVICE_UNAVAILABLE.as_u16())
    }
}

/// The Asana calls a provider fetch needs.
///
/// Uses `BoxFuture` for object safety (allows `Arc<dyn AsanaApi>`).
pub trait AsanaApi: Send + Sync {
    /// `GET /projects/{gid}`. A 404 is `Ok(None)`.
    fn get_project<'a>(
        &'a self,
        project_gid: &'a str,
        opt_fields: &'a [String],
    ) -> BoxFuture<'a, Result<Option<ProjectRecord>, ApiError>>;

    /// One page of `GET /projects/{gid}/tasks`.
    fn get_tasks_for_project<'a>(
        &'a self,
        project_gid: &'a str,
        opt_fields: &'a [String],
        offset: Option<String>,
    ) -> BoxFuture<'a, Result<Page<TaskRecord>, ApiError>>;

    /// `GET /tasks/{gid}`.
    fn get_task<'a>(
        &'a self,
        task_gid: &'a str,
        opt_fields: &'a [String],
    ) -> BoxFuture<'a, Result<TaskRecord, ApiError>>;

    /// One page of `GET /tasks/{gid}/stories`.
    fn get_stories_for_task<'a>(
        &'a self,
        task_gid: &'a str,
        opt_fields: &'a [String],
        offset: Option<String>,
    ) -> BoxFuture<'a, Result<Page<StoryRecord>, ApiError>>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    message: String,
}

/// HTTP implementation of [`AsanaApi`].
pub struct AsanaClient {
    client: Client,
    base_url: String,
    token: AccessToken,
}

impl AsanaClient {
    pub fn new(token: AccessToken) -> Result<Self, ApiError> {
        // Connections must not outlive the runtime that opened them; blocking
        // fetches run each on a fresh runtime.
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
        })
    }

    /// Point the client at another API root (trailing `/` is ignored).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path`, returning `None` on 404 and the decoded body otherwise.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        opt_fields: &[String],
        page_offset: Option<Option<String>>,
    ) -> Result<Option<T>, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let mut query: Vec<(&str, String)> = Vec::new();
        if !opt_fields.is_empty() {
            query.push(("opt_fields", opt_fields.join(",")));
        }
        if let Some(offset) = page_offset {
            query.push(("limit", PAGE_LIMIT.to_string()));
            if let Some(offset) = offset {
                query.push(("offset", offset));
            }
        }
        debug!(%url, "Asana request");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(self.token.expose())
            .header("accept", "application/json")
            .query(&query)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn get_resource<T: DeserializeOwned>(
        &self,
        path: &str,
        opt_fields: &[String],
    ) -> Result<Option<T>, ApiError> {
        let envelope: Option<Envelope<T>> = self.get_json(path, opt_fields, None).await?;
        Ok(envelope.map(|e| e.data))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        opt_fields: &[String],
        offset: Option<String>,
    ) -> Result<Page<T>, ApiError> {
        self.get_json(path, opt_fields, Some(offset))
            .await?
            .ok_or_else(|| not_found(path))
    }
}

fn not_found(path: &str) -> ApiError {
    ApiError::Status {
        status: StatusCode::NOT_FOUND.as_u16(),
        message: format!("{path} not found"),
    }
}

/// Join Asana's `errors[].message` entries, falling back to the status text.
fn error_message(status: StatusCode, body: &str) -> String {
    let messages: Vec<String> = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.errors.into_iter().map(|e| e.message).collect())
        .unwrap_or_default();
    let joined = messages
        .into_iter()
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    if !joined.is_empty() {
        joined
    } else {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    }
}

impl AsanaApi for AsanaClient {
    fn get_project<'a>(
        &'a self,
        project_gid: &'a str,
        opt_fields: &'a [String],
    ) -> BoxFuture<'a, Result<Option<ProjectRecord>, ApiError>> {
        Box::pin(async move {
            self.get_resource(&format!("/projects/{project_gid}"), opt_fields)
                .await
        })
    }

    fn get_tasks_for_project<'a>(
        &'a self,
        project_gid: &'a str,
        opt_fields: &'a [String],
        offset: Option<String>,
    ) -> BoxFuture<'a, Result<Page<TaskRecord>, ApiError>> {
        Box::pin(async move {
            self.get_page(&format!("/projects/{project_gid}/tasks"), opt_fields, offset)
                .await
        })
    }

    fn get_task<'a>(
        &'a self,
        task_gid: &'a str,
        opt_fields: &'a [String],
    ) -> BoxFuture<'a, Result<TaskRecord, ApiError>> {
        Box::pin(async move {
            let path = format!("/tasks/{task_gid}");
            self.get_resource(&path, opt_fields)
                .await?
                .ok_or_else(|| not_found(&path))
        })
    }

    fn get_stories_for_task<'a>(
        &'a self,
        task_gid: &'a str,
        opt_fields: &'a [String],
        offset: Option<String>,
    ) -> BoxFuture<'a, Result<Page<StoryRecord>, ApiError>> {
        Box::pin(async move {
            self.get_page(&format!("/tasks/{task_gid}/stories"), opt_fields, offset)
                .await
        })
    }
}
