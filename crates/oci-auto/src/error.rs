//! Configuration and precheck errors
//!
//! Typed errors for the fatal conditions that stop the tool before the
//! launch loop starts.

use oci_auto_common::ErrorKind;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings failed validation
    #[error("Invalid settings: {0}")]
    Invalid(#[from] garde::Report),

    /// OCI config file could not be read
    #[error("Failed to read OCI config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Requested profile section is not in the config file
    #[error("Profile [{profile}] not found in '{path}'")]
    MissingProfile { profile: String, path: String },

    /// Profile lacks a required key
    #[error("Profile [{profile}] is missing required key '{key}'")]
    MissingKey { profile: String, key: &'static str },

    /// Config file line could not be parsed
    #[error("Malformed line {line} in '{path}': {content}")]
    Malformed {
        path: String,
        line: usize,
        content: String,
    },

    /// Private key could not be read or decoded
    #[error("Failed to load private key '{path}': {reason}")]
    PrivateKey { path: String, reason: String },

    /// Passphrase-protected keys are not supported
    #[error("Private key '{0}' is encrypted; provide an unencrypted PEM key")]
    EncryptedKey(String),

    /// Endpoint override is not a valid URL
    #[error("Invalid endpoint URL '{0}'")]
    InvalidEndpoint(String),
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Quota audit rejections
///
/// Both variants halt the run after the audit and before the first attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrecheckError {
    #[error(
        "Total maximum resource exceeds free tier limit (over {cpu_ceiling} ocpus/{memory_ceiling} GB total): \
         would use {total_cpu} ocpus and {total_memory} GB"
    )]
    QuotaExceeded {
        total_cpu: u64,
        total_memory: u64,
        cpu_ceiling: u32,
        memory_ceiling: u32,
    },

    #[error("Duplicate display name: >>>{0}<<< Change this!")]
    DuplicateName(String),
}

impl PrecheckError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::DuplicateName(_) => ErrorKind::DuplicateName,
        }
    }
}
