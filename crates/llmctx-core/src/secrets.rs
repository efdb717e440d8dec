//! Access tokens and environment snapshots.
//!
//! Provider credentials come from the process environment (optionally
//! seeded from a `.env` file by the CLI). [`Environment`] captures those
//! variables once so provider factories can read them without touching
//! global state, and tests can supply their own.
//!
//! ## Security Properties
//!
//! - [`AccessToken`] values implement `Zeroize` and are cleared on drop.
//! - Token values are redacted in `Debug` output (shown as `[REDACTED]`).
//! - [`Environment`] only ever prints variable names, never values.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;

use zeroize::Zeroize;

/// A bearer credential for a remote API, zeroized on drop.
#[derive(Clone)]
pub struct AccessToken {
    inner: String,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Get the token as a string slice.
    ///
    /// Only the HTTP layer should need this.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("inner", &"[REDACTED]")
            .field("len", &self.inner.len())
            .finish()
    }
}

impl Drop for AccessToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

/// A snapshot of environment variables.
#[derive(Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// An environment with no variables set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the variables of the current process.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn from_process() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self {
            vars: vars
                .into_iter()
                .filter_map(|(name, value)| {
                    Some((name.into_string().ok()?, value.into_string().ok()?))
                })
                .collect(),
        }
    }

    /// Build an environment from explicit `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Return a copy of this environment with one more variable set.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Read a credential, treating an empty value the same as an unset one.
    pub fn token(&self, name: &str) -> Option<AccessToken> {
        self.get(name)
            .filter(|value| !value.trim().is_empty())
            .map(AccessToken::new)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Environment").field("vars", &names).finish()
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        for value in self.vars.values_mut() {
            value.zeroize();
        }
    }
}
