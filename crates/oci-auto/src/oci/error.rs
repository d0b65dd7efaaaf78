//! OCI error classification
//!
//! Service errors are classified by HTTP status and the OCI error `code`
//! right after each call, so callers branch on [`OciError`] variants and
//! never on message text.

use oci_auto_common::ErrorKind;
use thiserror::Error;

/// Service error details as returned by the OCI API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub status: u16,
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.message)?;
        if let Some(id) = &self.request_id {
            write!(f, " (opc-request-id: {id})")?;
        }
        Ok(())
    }
}

/// OCI error categories for retry decisions
#[derive(Debug, Error)]
pub enum OciError {
    /// No host capacity for the shape (expected while waiting)
    #[error("Out of host capacity: {0}")]
    CapacityUnavailable(ServiceError),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    Throttled(ServiceError),

    /// Credentials rejected or resource not visible to them
    #[error("Not authorized: {0}")]
    Auth(ServiceError),

    /// Request rejected as invalid
    #[error("Request rejected: {0}")]
    Client(ServiceError),

    /// Unexpected service-side failure
    #[error("Service error: {0}")]
    Service(ServiceError),

    /// Network failure, timeout, or unreadable response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The HTTP session was already released
    #[error("HTTP session is closed")]
    SessionClosed,
}

impl OciError {
    /// Map to the launch flow's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OciError::CapacityUnavailable(_) => ErrorKind::CapacityUnavailable,
            OciError::Auth(_) | OciError::Client(_) => ErrorKind::ClientRejected,
            OciError::Throttled(_)
            | OciError::Service(_)
            | OciError::Transport(_)
            | OciError::SessionClosed => ErrorKind::TransientRemote,
        }
    }

    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            OciError::CapacityUnavailable(e)
            | OciError::Throttled(e)
            | OciError::Auth(e)
            | OciError::Client(e)
            | OciError::Service(e) => Some(e),
            OciError::Transport(_) | OciError::SessionClosed => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.service_error().map(|e| e.status)
    }

    pub fn code(&self) -> Option<&str> {
        self.service_error().map(|e| e.code.as_str())
    }

    /// Short message without the classification prefix
    pub fn message(&self) -> String {
        match self.service_error() {
            Some(e) => e.message.clone(),
            None => self.to_string(),
        }
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        let code = self.code()?;
        SUGGESTIONS
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, s)| *s)
    }
}

impl From<reqwest::Error> for OciError {
    fn from(e: reqwest::Error) -> Self {
        OciError::Transport(e.to_string())
    }
}

/// Message OCI uses for the capacity error
const CAPACITY_MESSAGE: &str = "Out of host capacity";

/// Known OCI error codes for throttling
const THROTTLING_CODES: &[&str] = &["TooManyRequests"];

/// Known OCI error codes for authentication/authorization failures
const AUTH_CODES: &[&str] = &["NotAuthenticated", "NotAuthorizedOrNotFound", "NotAuthorized"];

/// Classify an OCI service error from its status, code, and message.
pub fn classify_service_error(
    status: u16,
    code: Option<&str>,
    message: Option<&str>,
    request_id: Option<&str>,
) -> OciError {
    let err = ServiceError {
        status,
        code: code.unwrap_or("Unknown").to_string(),
        message: message.unwrap_or("Unknown error").to_string(),
        request_id: request_id.map(str::to_string),
    };

    // OCI reports missing capacity as `500 InternalError`
    if status == 500 || err.message.contains(CAPACITY_MESSAGE) {
        return OciError::CapacityUnavailable(err);
    }

    match status {
        429 => OciError::Throttled(err),
        _ if THROTTLING_CODES.contains(&err.code.as_str()) => OciError::Throttled(err),
        401 => OciError::Auth(err),
        _ if AUTH_CODES.contains(&err.code.as_str()) => OciError::Auth(err),
        400..=499 => OciError::Client(err),
        _ => OciError::Service(err),
    }
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "NotAuthenticated",
        "Check user, tenancy, fingerprint and key_file in the OCI config file.",
    ),
    (
        "NotAuthorizedOrNotFound",
        "Check the compartment OCID and that the user's group has a policy to manage instances in it.",
    ),
    (
        "InvalidParameter",
        "Check the image, subnet, and availability domain identifiers.",
    ),
    (
        "LimitExceeded",
        "The tenancy service limit for this shape is reached; free an existing instance first.",
    ),
    (
        "TooManyRequests",
        "OCI API rate limit hit. The request will be retried after the wait interval.",
    ),
    (
        "InternalError",
        "No capacity in this availability domain yet. Keep waiting or try another availability domain.",
    ),
];
