//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::Path;

use netgate_config::{AccessRuleConfig, AppConfig};

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .backend("rules")
///     .rule("approx", "192.168.", "allow", 10)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.config.interface.name = Some(name.to_string());
        self
    }

    pub fn backend(mut self, backend: &str) -> Self {
        self.config.access.backend = backend.to_string();
        self
    }

    pub fn tables(mut self, allow_file: &Path, deny_file: &Path) -> Self {
        self.config.access.allow_file = allow_file.to_path_buf();
        self.config.access.deny_file = deny_file.to_path_buf();
        self
    }

    pub fn no_match(mut self, effect: &str) -> Self {
        self.config.access.no_match = effect.to_string();
        self
    }

    pub fn rule(mut self, daemon: &str, client: &str, effect: &str, priority: u32) -> Self {
        self.config.access.rules.push(AccessRuleConfig {
            daemon: daemon.to_string(),
            client: client.to_string(),
            effect: effect.to_string(),
            priority,
        });
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
