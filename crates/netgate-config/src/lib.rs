#![deny(unsafe_code)]

//! Configuration loading, validation, and host access tables for netgate.
//!
//! Loads TOML configuration files and validates them. Provides the
//! [`AppConfig`] type as the central configuration structure, the [`table`]
//! module for `hosts.allow`-style access tables, and the [`policy`] module for
//! priority-ordered rule sets.

/// Client and daemon pattern language.
pub mod pattern;
/// Priority-ordered access rules.
pub mod policy;
/// `hosts.allow` / `hosts.deny` tables.
pub mod table;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interface lookup configuration.
    #[serde(default)]
    pub interface: InterfaceConfig,

    /// Access control configuration.
    #[serde(default)]
    pub access: AccessConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Interface lookup configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Interface used when none is named on the command line (e.g. "eth0").
    #[serde(default)]
    pub name: Option<String>,
}

/// Access control configuration.
///
/// ## TOML Example
///
/// ```toml
/// [access]
/// backend = "hosts"
/// allow_file = "/etc/hosts.allow"
/// deny_file = "/etc/hosts.deny"
/// no_match = "deny"
///
/// [[access.rules]]
/// daemon = "approx"
/// client = "192.168. EXCEPT 192.168.1.1"
/// effect = "allow"
/// priority = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Evaluator backend: "hosts", "rules", or "libwrap".
    #[serde(default = "default_access_backend")]
    pub backend: String,

    /// Allow table consulted first by the "hosts" backend.
    #[serde(default = "default_allow_file")]
    pub allow_file: PathBuf,

    /// Deny table consulted second by the "hosts" backend.
    #[serde(default = "default_deny_file")]
    pub deny_file: PathBuf,

    /// Effect when no table entry or rule matches ("deny" or "allow").
    #[serde(default = "default_no_match")]
    pub no_match: String,

    /// Rules for the "rules" backend.
    #[serde(default)]
    pub rules: Vec<AccessRuleConfig>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            backend: default_access_backend(),
            allow_file: default_allow_file(),
            deny_file: default_deny_file(),
            no_match: default_no_match(),
            rules: Vec::new(),
        }
    }
}

/// A single access rule as expressed in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRuleConfig {
    /// Daemon pattern list (e.g. "sshd, approx", "ALL").
    pub daemon: String,
    /// Client pattern list (e.g. ".example.com EXCEPT gw.example.com").
    pub client: String,
    /// Effect ("allow" or "deny").
    pub effect: String,
    /// Priority (higher = evaluated first).
    #[serde(default)]
    pub priority: u32,
}

fn default_access_backend() -> String {
    "hosts".to_string()
}

fn default_allow_file() -> PathBuf {
    PathBuf::from("/etc/hosts.allow")
}

fn default_deny_file() -> PathBuf {
    PathBuf::from("/etc/hosts.deny")
}

fn default_no_match() -> String {
    "deny".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter used by the CLI when neither `-v` nor `RUST_LOG` is given
    /// (e.g. "warn", "debug", "netgate_core=trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interface.name.as_deref() == Some("") {
            return Err(ConfigError::Validation(
                "interface.name must not be empty".to_string(),
            ));
        }

        let valid_backends = ["hosts", "rules", "libwrap"];
        if !valid_backends.contains(&self.access.backend.as_str()) {
            return Err(ConfigError::Validation(format!(
                "access.backend must be one of {:?}, got {:?}",
                valid_backends, self.access.backend
            )));
        }
        if policy::Effect::from_name(&self.access.no_match).is_none() {
            return Err(ConfigError::Validation(format!(
                "access.no_match must be \"allow\" or \"deny\", got {:?}",
                self.access.no_match
            )));
        }
        if self.access.allow_file.as_os_str().is_empty()
            || self.access.deny_file.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation(
                "access.allow_file and access.deny_file must not be empty".to_string(),
            ));
        }

        for (i, rule) in self.access.rules.iter().enumerate() {
            if policy::Effect::from_name(&rule.effect).is_none() {
                return Err(ConfigError::Validation(format!(
                    "access.rules[{i}].effect must be \"allow\" or \"deny\", got {:?}",
                    rule.effect
                )));
            }
            if pattern::PatternList::parse(&rule.daemon).is_empty() {
                return Err(ConfigError::Validation(format!(
                    "access.rules[{i}].daemon must not be empty"
                )));
            }
            if pattern::PatternList::parse(&rule.client).is_empty() {
                return Err(ConfigError::Validation(format!(
                    "access.rules[{i}].client must not be empty"
                )));
            }
        }

        Ok(())
    }

    /// Effect applied when nothing matches. Validation guarantees a known
    /// value; anything else falls back to deny.
    pub fn no_match_effect(&self) -> policy::Effect {
        policy::Effect::from_name(&self.access.no_match).unwrap_or(policy::Effect::Deny)
    }

    /// Build a [`PolicyEngine`](policy::PolicyEngine) from the configured rules.
    pub fn build_policy_engine(&self) -> policy::PolicyEngine {
        let rules: Vec<policy::PolicyRule> = self
            .access
            .rules
            .iter()
            .map(|r| policy::PolicyRule {
                daemons: pattern::PatternList::parse(&r.daemon),
                clients: pattern::PatternList::parse(&r.client),
                effect: policy::Effect::from_name(&r.effect).unwrap_or(policy::Effect::Deny),
                priority: r.priority,
            })
            .collect();

        policy::build_policy(rules)
    }
}
