//! OCI config file profiles
//!
//! Reads the INI-style `~/.oci/config` format. Keys missing from the
//! selected profile fall back to the `[DEFAULT]` section, as the official
//! SDKs do.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_SECTION: &str = "DEFAULT";

/// Credentials and region from one profile section
#[derive(Clone, PartialEq, Eq)]
pub struct OciProfile {
    pub user: String,
    pub fingerprint: String,
    pub tenancy: String,
    pub region: String,
    pub key_file: PathBuf,
}

impl OciProfile {
    /// Load a profile from a config file on disk.
    pub fn load(path: &Path, profile: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        let mut parsed = Self::parse(&content, &path.display().to_string(), profile)?;

        // Relative key paths are resolved against the config file's directory
        if parsed.key_file.is_relative() {
            if let Some(dir) = path.parent() {
                parsed.key_file = dir.join(&parsed.key_file);
            }
        }
        Ok(parsed)
    }

    /// Parse config file content. `source` is only used in error messages.
    pub fn parse(content: &str, source: &str, profile: &str) -> Result<Self, ConfigError> {
        let sections = parse_sections(content, source)?;

        if !sections.contains_key(profile) {
            return Err(ConfigError::MissingProfile {
                profile: profile.to_string(),
                path: source.to_string(),
            });
        }

        let lookup = |key: &'static str| -> Option<String> {
            sections
                .get(profile)
                .and_then(|s| s.get(key))
                .or_else(|| sections.get(DEFAULT_SECTION).and_then(|s| s.get(key)))
                .cloned()
        };
        let require = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key).ok_or_else(|| ConfigError::MissingKey {
                profile: profile.to_string(),
                key,
            })
        };

        Ok(Self {
            user: require("user")?,
            fingerprint: require("fingerprint")?,
            tenancy: require("tenancy")?,
            region: require("region")?,
            key_file: expand_home(&require("key_file")?),
        })
    }

    /// Key identifier used in request signatures
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy, self.user, self.fingerprint)
    }
}

impl std::fmt::Debug for OciProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OciProfile")
            .field("user", &self.user)
            .field("tenancy", &self.tenancy)
            .field("region", &self.region)
            .field("key_file", &self.key_file)
            .finish_non_exhaustive()
    }
}

type Sections = HashMap<String, HashMap<String, String>>;

fn parse_sections(content: &str, source: &str) -> Result<Sections, ConfigError> {
    let mut sections: Sections = HashMap::new();
    let mut current: Option<String> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let malformed = || ConfigError::Malformed {
            path: source.to_string(),
            line: idx + 1,
            content: raw.to_string(),
        };

        if let Some(name) = line.strip_prefix('[') {
            let name = name.strip_suffix(']').ok_or_else(malformed)?.trim();
            sections.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(malformed)?;
        let section = current.as_ref().ok_or_else(malformed)?;
        sections
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(sections)
}

/// Expand a leading `~` to the current user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
