//! OCI config file fixtures
//!
//! Writes a config file and private key into a temp directory so tests can
//! exercise the real loading path.

use crate::keys::{TEST_FINGERPRINT, TEST_PRIVATE_KEY_PKCS1};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TEST_TENANCY: &str = "ocid1.tenancy.oc1..aaaatesttenancy";
pub const TEST_USER: &str = "ocid1.user.oc1..aaaatestuser";
pub const TEST_REGION: &str = "eu-frankfurt-1";

/// A temp directory holding `config` and `key.pem`.
///
/// The directory is deleted when this value is dropped.
pub struct TestProfile {
    dir: TempDir,
}

impl TestProfile {
    /// Write a `[DEFAULT]` profile pointing at the PKCS#1 test key.
    pub fn new() -> Self {
        Self::with_profile("DEFAULT")
    }

    /// Write a profile under the given section name.
    pub fn with_profile(name: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&key_path, TEST_PRIVATE_KEY_PKCS1).expect("write key");

        let config = format!(
            "[{name}]\n\
             user={TEST_USER}\n\
             fingerprint={TEST_FINGERPRINT}\n\
             tenancy={TEST_TENANCY}\n\
             region={TEST_REGION}\n\
             key_file={}\n",
            key_path.display()
        );
        std::fs::write(dir.path().join("config"), config).expect("write config");

        Self { dir }
    }

    /// Path of the generated config file
    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    /// Path of the generated private key
    pub fn key_path(&self) -> PathBuf {
        self.dir.path().join("key.pem")
    }

    /// Directory holding the fixture files
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TestProfile {
    fn default() -> Self {
        Self::new()
    }
}
