//! Access table fixtures.
//!
//! [`HostsFixture`] owns a temporary directory holding a `hosts.allow` and a
//! `hosts.deny` file. The directory is deleted automatically when the fixture
//! is dropped, guaranteeing cleanup even on panic.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A test-scoped pair of access tables.
pub struct HostsFixture {
    allow_path: PathBuf,
    deny_path: PathBuf,
    temp_dir: TempDir,
}

impl HostsFixture {
    /// Create both tables with the given contents.
    pub fn new(allow: &str, deny: &str) -> Self {
        let fixture = Self::empty();
        fixture.write_allow(allow);
        fixture.write_deny(deny);
        fixture
    }

    /// Create the directory only; neither table file exists.
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        Self {
            allow_path: temp_dir.path().join("hosts.allow"),
            deny_path: temp_dir.path().join("hosts.deny"),
            temp_dir,
        }
    }

    /// Overwrite the allow table (for re-read testing).
    pub fn write_allow(&self, content: &str) {
        std::fs::write(&self.allow_path, content).expect("failed to write hosts.allow");
    }

    /// Overwrite the deny table.
    pub fn write_deny(&self, content: &str) {
        std::fs::write(&self.deny_path, content).expect("failed to write hosts.deny");
    }

    pub fn allow_path(&self) -> &Path {
        &self.allow_path
    }

    pub fn deny_path(&self) -> &Path {
        &self.deny_path
    }

    /// The directory holding both tables.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }
}
