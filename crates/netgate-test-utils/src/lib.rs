#![deny(unsafe_code)]

//! Shared test utilities for the netgate workspace.
//!
//! Provides reusable fixtures, config builders, and tracing helpers so that
//! individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! netgate-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod hosts;
pub mod tracing_setup;
