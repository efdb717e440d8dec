//! Context provider trait, the core abstraction for external data sources.
//!
//! Every provider (Asana today, other trackers later) implements
//! [`ContextProvider`]. Providers that maintain a search index separate from
//! their rendered text additionally implement [`IndexedProvider`] and expose
//! it through [`ContextProvider::as_indexed`].

use std::future::Future;

use crate::BoxFuture;
use crate::status::StatusReport;

/// Errors from provider construction and fetches.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no provider registered under {0:?}")]
    Unregistered(String),

    #[error("{call} failed after {attempts} attempt(s): {source}")]
    Api {
        call: &'static str,
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("a fetch is already in progress for {0}")]
    FetchInProgress(String),

    #[error("blocking fetch called from inside an async runtime; use the async variant")]
    BlockingInAsync,

    #[error("failed to start a runtime for a blocking fetch: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ProviderError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error came from construction-time configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Unregistered(_))
    }
}

/// Core trait for context providers.
///
/// Implementations must be `Send + Sync`; state lives behind interior
/// mutability so the rendered context can be read while a fetch runs.
/// Uses `BoxFuture` for object safety (allows `Box<dyn ContextProvider>`).
pub trait ContextProvider: Send + Sync {
    /// The configuration name this provider was built under (e.g. "asana").
    fn name(&self) -> &str;

    /// Retrieve and render the external data.
    ///
    /// Marks the provider `Fetching` for the duration, then `Fresh` with the
    /// new text on success or `Stale` on failure. Errors are returned to the
    /// caller, never swallowed.
    fn fetch_context(&self, full_fetch: bool) -> BoxFuture<'_, Result<(), ProviderError>>;

    /// Blocking variant of [`fetch_context`](Self::fetch_context).
    ///
    /// Drives the async fetch on a dedicated current-thread runtime. Must not
    /// be called from inside an async runtime.
    fn fetch_context_blocking(&self, full_fetch: bool) -> Result<(), ProviderError> {
        block_on_dedicated(self.fetch_context(full_fetch))?
    }

    /// The text rendered by the last successful fetch.
    fn get_context(&self) -> Option<String>;

    /// Current status snapshot.
    fn report_status(&self) -> StatusReport;

    /// The indexing capability, if this provider has one.
    fn as_indexed(&self) -> Option<&dyn IndexedProvider> {
        None
    }
}

/// Optional search-index capability.
pub trait IndexedProvider: Send + Sync {
    /// Build or refresh the provider's index from its current data.
    fn index_context(&self) -> BoxFuture<'_, Result<(), ProviderError>>;

    /// Query the index.
    fn search_index(&self, query: &str) -> BoxFuture<'_, Result<String, ProviderError>>;

    /// Replace the rendered context with search results.
    fn load_from_index(&self, results: String);
}

/// Run `fut` to completion on a fresh current-thread runtime.
///
/// Refuses to run when the calling thread is already inside a tokio runtime,
/// since blocking there would stall (or deadlock) that runtime.
pub fn block_on_dedicated<F: Future>(fut: F) -> Result<F::Output, ProviderError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(ProviderError::BlockingInAsync);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(fut))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ProviderState, Status};

    struct EchoProvider {
        state: ProviderState,
    }

    impl ContextProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn fetch_context(&self, _full_fetch: bool) -> BoxFuture<'_, Result<(), ProviderError>> {
            Box::pin(async move {
                self.state.update_status(Status::Fetching);
                tokio::task::yield_now().await;
                self.state.complete_fetch("# Echo\n".to_string());
                Ok(())
            })
        }

        fn get_context(&self) -> Option<String> {
            self.state.context()
        }

        fn report_status(&self) -> StatusReport {
            self.state.report()
        }
    }

    fn echo() -> EchoProvider {
        EchoProvider {
            state: ProviderState::new(),
        }
    }

    #[test]
    fn test_blocking_fetch_outside_runtime() {
        let provider = echo();
        provider.fetch_context_blocking(false).unwrap();
        assert_eq!(provider.report_status().status, Status::Fresh);
        assert_eq!(provider.get_context().as_deref(), Some("# Echo\n"));
    }

    #[tokio::test]
    async fn test_blocking_fetch_inside_runtime_is_rejected() {
        let provider = echo();
        let err = provider.fetch_context_blocking(false).unwrap_err();
        assert!(matches!(err, ProviderError::BlockingInAsync));
        assert_eq!(provider.report_status().status, Status::Stale);
    }

    #[tokio::test]
    async fn test_async_fetch() {
        let provider = echo();
        provider.fetch_context(true).await.unwrap();
        assert_eq!(provider.report_status().status, Status::Fresh);
    }

    #[test]
    fn test_indexing_is_opt_in() {
        assert!(echo().as_indexed().is_none());
    }

    #[test]
    fn test_error_classification() {
        assert!(ProviderError::config("missing").is_config());
        assert!(ProviderError::Unregistered("jira".into()).is_config());
        assert!(!ProviderError::BlockingInAsync.is_config());
    }

    #[test]
    fn test_api_error_display_names_call() {
        let err = ProviderError::Api {
            call: "get_tasks_for_project",
            attempts: 3,
            source: "503 Service Unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "get_tasks_for_project failed after 3 attempt(s): 503 Service Unavailable"
        );
    }
}
