#![deny(unsafe_code)]

//! llmctx core: context providers and the manager that drives them.
//!
//! A context provider wraps one external project-management service, fetches
//! its current state, and renders it as Markdown text for a downstream LLM
//! pipeline. The [`ContextManager`] builds the enabled providers from
//! configuration through a [`ProviderRegistry`] and runs batch operations
//! across them.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future. The standard return type for async
/// trait methods that require dynamic dispatch (`dyn Trait`).
///
/// Native `async fn` in traits produces opaque return types that are not
/// object-safe, so traits consumed via `Box<dyn Trait>` return this instead.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Asana task-tracker provider.
pub mod asana;
/// Batch operations over configured providers.
pub mod manager;
/// Markdown building blocks and the timezone-aware date formatter.
pub mod markdown;
/// The provider contract and its optional indexing capability.
pub mod provider;
/// Name → factory mapping used to build providers from configuration.
pub mod registry;
/// Fixed-count retry for transient remote failures.
pub mod retry;
/// Access tokens and environment snapshots.
pub mod secrets;
/// Provider lifecycle status.
pub mod status;

pub use asana::AsanaProvider;
pub use manager::{ContextManager, FetchFailure, SkippedProvider};
pub use provider::{ContextProvider, IndexedProvider, ProviderError};
pub use registry::{ProviderFactory, ProviderRegistry, ProviderSetup};
pub use retry::RetryPolicy;
pub use secrets::{AccessToken, Environment};
pub use status::{Status, StatusReport};
