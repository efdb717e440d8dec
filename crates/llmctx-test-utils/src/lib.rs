#![deny(unsafe_code)]

//! Shared test utilities for the llmctx workspace.
//!
//! Provides config builders and a scripted Asana API so that individual
//! crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! llmctx-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod fake_asana;
