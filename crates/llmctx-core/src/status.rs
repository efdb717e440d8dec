//! Provider lifecycle status.
//!
//! Every provider moves through `Stale → Fetching → Fresh` (or back to
//! `Stale` on failure), with `Indexing` as a side branch. [`ProviderState`]
//! bundles the status with the last rendered text so both are updated under
//! one lock.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Freshness of a provider's rendered context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No successful fetch, or the last attempt failed.
    Stale,
    /// A fetch is in flight.
    Fetching,
    /// The rendered context reflects the last completed fetch.
    Fresh,
    /// The provider is rebuilding its search index.
    Indexing,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Stale => "stale",
            Status::Fetching => "fetching",
            Status::Fresh => "fresh",
            Status::Indexing => "indexing",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot returned by `report_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: Status,
    /// When the status last changed; `None` if it never has.
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Inner {
    status: Status,
    last_updated: Option<DateTime<Utc>>,
    context: Option<String>,
}

/// Shared status and rendered-context cell owned by a provider.
///
/// Readers never observe a half-written context: the text is swapped in
/// whole, in the same critical section that marks the provider fresh.
#[derive(Debug)]
pub struct ProviderState {
    inner: Mutex<Inner>,
}

impl ProviderState {
    /// A stale state with no context and no timestamp.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: Status::Stale,
                last_updated: None,
                context: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded data stays consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the status and stamp the current time.
    pub fn update_status(&self, status: Status) {
        let mut inner = self.lock();
        inner.status = status;
        inner.last_updated = Some(Utc::now());
    }

    /// Store freshly rendered text and mark the provider fresh.
    pub fn complete_fetch(&self, context: String) {
        let mut inner = self.lock();
        inner.context = Some(context);
        inner.status = Status::Fresh;
        inner.last_updated = Some(Utc::now());
    }

    /// Mark the provider `Fetching` and return a guard for the attempt.
    ///
    /// The guard must be resolved with [`FetchAttempt::succeed`] or
    /// [`FetchAttempt::fail`]; if it is dropped unresolved (e.g. the fetch
    /// future was cancelled) the provider falls back to `Stale`.
    pub fn begin_fetch(&self) -> FetchAttempt<'_> {
        self.update_status(Status::Fetching);
        FetchAttempt {
            state: self,
            resolved: false,
        }
    }

    /// Replace the rendered text without touching the status.
    pub fn replace_context(&self, context: String) {
        self.lock().context = Some(context);
    }

    pub fn status(&self) -> Status {
        self.lock().status
    }

    pub fn report(&self) -> StatusReport {
        let inner = self.lock();
        StatusReport {
            status: inner.status,
            last_updated: inner.last_updated,
        }
    }

    pub fn context(&self) -> Option<String> {
        self.lock().context.clone()
    }
}

impl Default for ProviderState {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-flight fetch. Never leaves the provider in `Fetching`.
#[derive(Debug)]
pub struct FetchAttempt<'a> {
    state: &'a ProviderState,
    resolved: bool,
}

impl FetchAttempt<'_> {
    /// Store the rendered text and mark the provider `Fresh`.
    pub fn succeed(mut self, context: String) {
        self.resolved = true;
        self.state.complete_fetch(context);
    }

    /// Mark the provider `Stale`, keeping the previous text.
    pub fn fail(mut self) {
        self.resolved = true;
        self.state.update_status(Status::Stale);
    }
}

impl Drop for FetchAttempt<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.state.update_status(Status::Stale);
        }
    }
}
