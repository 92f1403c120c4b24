//! `hosts.allow` / `hosts.deny` evaluation.
//!
//! Access is granted on the first allow-table match, denied on the first
//! deny-table match, and otherwise falls to the configured no-match effect.
//! An `allow` or `deny` option on the matching line overrides the table.

use std::path::{Path, PathBuf};

use netgate_config::AppConfig;
use netgate_config::pattern::AccessQuery;
use netgate_config::policy::{Effect, PolicyDecision};
use netgate_config::table::AccessTable;

use super::{AccessError, AccessEvaluator};

/// Evaluator over a pair of access tables, re-read on every query.
#[derive(Debug, Clone)]
pub struct HostsAccess {
    allow_file: PathBuf,
    deny_file: PathBuf,
    no_match: Effect,
}

impl HostsAccess {
    pub fn new(allow_file: impl Into<PathBuf>, deny_file: impl Into<PathBuf>) -> Self {
        Self {
            allow_file: allow_file.into(),
            deny_file: deny_file.into(),
            no_match: Effect::Deny,
        }
    }

    /// Override the effect used when neither table matches.
    pub fn with_no_match(mut self, effect: Effect) -> Self {
        self.no_match = effect;
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.access.allow_file, &config.access.deny_file)
            .with_no_match(config.no_match_effect())
    }

    fn load(path: &Path) -> Result<AccessTable, AccessError> {
        AccessTable::load(path).map_err(|source| AccessError::Table {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl AccessEvaluator for HostsAccess {
    fn name(&self) -> &str {
        "hosts"
    }

    fn evaluate(&self, query: &AccessQuery<'_>) -> Result<PolicyDecision, AccessError> {
        let allow = Self::load(&self.allow_file)?;
        if let Some(entry) = allow.first_match(query) {
            tracing::trace!(
                file = %self.allow_file.display(),
                line = entry.line,
                "allow table match"
            );
            return Ok(entry.verdict(Effect::Allow).decision());
        }

        let deny = Self::load(&self.deny_file)?;
        if let Some(entry) = deny.first_match(query) {
            tracing::trace!(
                file = %self.deny_file.display(),
                line = entry.line,
                "deny table match"
            );
            return Ok(entry.verdict(Effect::Deny).decision());
        }

        Ok(self.no_match.decision())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgate_test_utils::hosts::HostsFixture;
    use pretty_assertions::assert_eq;

    fn q<'a>(daemon: &'a str, host: &'a str, addr: &'a str) -> AccessQuery<'a> {
        AccessQuery::new(daemon, host, addr, "alice")
    }

    #[test]
    fn test_allow_table_wins() {
        let fx = HostsFixture::new("sshd : .example.com\n", "ALL : ALL\n");
        let eval = HostsAccess::new(fx.allow_path(), fx.deny_path());
        assert_eq!(
            eval.evaluate(&q("sshd", "client.example.com", "203.0.113.5")).unwrap(),
            PolicyDecision::Allowed
        );
        assert_eq!(
            eval.evaluate(&q("sshd", "client.example.org", "198.51.100.5")).unwrap(),
            PolicyDecision::Denied
        );
    }

    #[test]
    fn test_no_match_effect() {
        let fx = HostsFixture::new("", "");
        let closed = HostsAccess::new(fx.allow_path(), fx.deny_path());
        let open = closed.clone().with_no_match(Effect::Allow);
        let query = q("sshd", "client.example.com", "203.0.113.5");
        assert_eq!(closed.evaluate(&query).unwrap(), PolicyDecision::Denied);
        assert_eq!(open.evaluate(&query).unwrap(), PolicyDecision::Allowed);
    }

    #[test]
    fn test_missing_tables_are_empty() {
        let fx = HostsFixture::empty();
        let eval =
            HostsAccess::new(fx.allow_path(), fx.deny_path()).with_no_match(Effect::Allow);
        assert_eq!(
            eval.evaluate(&q("sshd", "h", "192.0.2.1")).unwrap(),
            PolicyDecision::Allowed
        );
    }

    #[test]
    fn test_option_overrides_table() {
        let fx = HostsFixture::new("ALL : UNKNOWN : deny\nALL : ALL\n", "");
        let eval = HostsAccess::new(fx.allow_path(), fx.deny_path());
        assert_eq!(
            eval.evaluate(&q("approx", "unknown", "192.0.2.1")).unwrap(),
            PolicyDecision::Denied
        );
        assert_eq!(
            eval.evaluate(&q("approx", "a.example.com", "192.0.2.1")).unwrap(),
            PolicyDecision::Allowed
        );
    }

    #[test]
    fn test_tables_are_reread() {
        let fx = HostsFixture::new("", "");
        let eval = HostsAccess::new(fx.allow_path(), fx.deny_path());
        let query = q("sshd", "h", "192.0.2.1");
        assert_eq!(eval.evaluate(&query).unwrap(), PolicyDecision::Denied);

        fx.write_allow("sshd : 192.0.2.\n");
        assert_eq!(eval.evaluate(&query).unwrap(), PolicyDecision::Allowed);
    }

    #[test]
    fn test_unreadable_table_is_an_error() {
        let fx = HostsFixture::empty();
        // A directory in place of the allow file cannot be read as text.
        let eval = HostsAccess::new(fx.dir(), fx.deny_path());
        assert!(matches!(
            eval.evaluate(&q("sshd", "h", "192.0.2.1")),
            Err(AccessError::Table { .. })
        ));
    }
}
