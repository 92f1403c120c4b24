#![deny(unsafe_code)]

//! netgate core: the two host facilities a proxy needs from the OS.
//!
//! - [`netif::resolve`] reads the IPv4 address configured on a named network
//!   interface.
//! - [`AccessPolicyChecker::is_allowed`] decides whether a daemon may serve a
//!   client, tcp-wrappers style, failing closed.
//!
//! Both are synchronous, blocking, and keep no state between calls.

/// Host-based access checks with pluggable evaluators.
pub mod access;
/// IPv4 address lookup for a named interface.
#[allow(unsafe_code)]
pub mod netif;

pub use access::{
    AccessError, AccessEvaluator, AccessPolicyChecker, HostsAccess, RuleSetEvaluator,
};
pub use netgate_config::pattern::AccessQuery;
pub use netgate_config::policy::{Effect, PolicyDecision};
pub use netif::{InterfaceName, NotFound, NotFoundReason};
