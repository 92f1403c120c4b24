//! Host-based access checks.
//!
//! [`AccessPolicyChecker`] answers one question: may this daemon serve this
//! client? The decision itself comes from an [`AccessEvaluator`], so the rule
//! source can be swapped without touching callers:
//!
//! | Backend | Rule source |
//! |---------|-------------|
//! | [`HostsAccess`] | `hosts.allow` / `hosts.deny` tables |
//! | [`RuleSetEvaluator`] | `[[access.rules]]` in the TOML config |
//! | `LibwrapEvaluator` | the system libwrap (`libwrap` feature) |
//!
//! The checker fails closed: a denial, an unmatched query, and any evaluator
//! error all come back as `false`.

use std::io;
use std::path::PathBuf;

use netgate_config::AppConfig;
use netgate_config::pattern::AccessQuery;
use netgate_config::policy::PolicyDecision;

pub mod hosts;
#[cfg(feature = "libwrap")]
#[allow(unsafe_code)]
pub mod libwrap;
pub mod rules;

pub use hosts::HostsAccess;
#[cfg(feature = "libwrap")]
pub use libwrap::LibwrapEvaluator;
pub use rules::RuleSetEvaluator;

/// Errors raised inside an evaluator. They never reach the checker's caller.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("failed to read access table {path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} contains a NUL byte")]
    InvalidArgument(&'static str),

    #[error("unsupported access backend: {0}")]
    UnsupportedBackend(String),
}

/// A source of access decisions.
pub trait AccessEvaluator: Send + Sync {
    /// Short backend name for logs (e.g. "hosts").
    fn name(&self) -> &str;

    /// Decide `query`. Backends apply their own no-match default; a
    /// remaining [`PolicyDecision::NoMatch`] is treated as a denial.
    fn evaluate(&self, query: &AccessQuery<'_>) -> Result<PolicyDecision, AccessError>;
}

/// Allow/deny front end over an [`AccessEvaluator`].
pub struct AccessPolicyChecker {
    evaluator: Box<dyn AccessEvaluator>,
}

impl AccessPolicyChecker {
    pub fn new(evaluator: impl AccessEvaluator + 'static) -> Self {
        Self {
            evaluator: Box::new(evaluator),
        }
    }

    /// Build the checker selected by `access.backend`.
    pub fn from_config(config: &AppConfig) -> Result<Self, AccessError> {
        match config.access.backend.as_str() {
            "hosts" => Ok(Self::new(HostsAccess::from_config(config))),
            "rules" => Ok(Self::new(RuleSetEvaluator::from_config(config))),
            #[cfg(feature = "libwrap")]
            "libwrap" => Ok(Self::new(LibwrapEvaluator::new())),
            #[cfg(not(feature = "libwrap"))]
            "libwrap" => Err(AccessError::UnsupportedBackend(
                "libwrap (built without the `libwrap` feature)".to_string(),
            )),
            other => Err(AccessError::UnsupportedBackend(other.to_string())),
        }
    }

    /// Name of the evaluator in use.
    pub fn backend(&self) -> &str {
        self.evaluator.name()
    }

    /// Whether `daemon` may serve the client identified by `host`, `address`
    /// and `user`. The values are passed to the evaluator unmodified.
    pub fn is_allowed(&self, daemon: &str, host: &str, address: &str, user: &str) -> bool {
        self.check(&AccessQuery::new(daemon, host, address, user))
    }

    /// [`is_allowed`](Self::is_allowed) for a prepared query.
    pub fn check(&self, query: &AccessQuery<'_>) -> bool {
        match self.evaluator.evaluate(query) {
            Ok(decision) => {
                tracing::debug!(
                    backend = self.evaluator.name(),
                    daemon = query.daemon,
                    host = query.client_host,
                    address = query.client_addr,
                    user = query.client_user,
                    ?decision,
                    "access decision"
                );
                decision.is_allowed()
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.evaluator.name(),
                    daemon = query.daemon,
                    address = query.client_addr,
                    error = %e,
                    "access evaluation failed; denying"
                );
                false
            }
        }
    }
}
