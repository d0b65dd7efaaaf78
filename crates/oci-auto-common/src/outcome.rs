//! Error-kind taxonomy and launch attempt outcomes
//!
//! Every remote call is classified into an [`ErrorKind`] right after it
//! returns; the launch loop only ever branches on the classified value.

use serde::Serialize;

/// Classified failure kinds for the launch flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid settings; halts before any remote call
    Configuration,
    /// The request would exceed the free-tier ceiling
    QuotaExceeded,
    /// The display name is already in use in the compartment
    DuplicateName,
    /// No host capacity for the shape right now (expected while waiting)
    CapacityUnavailable,
    /// Network, timeout, throttling, or unexpected service error
    TransientRemote,
    /// The provider rejected the request as malformed or unauthorized
    ClientRejected,
    /// Operator interrupt
    UserCancellation,
}

impl ErrorKind {
    /// Kinds the launch loop sleeps on and retries.
    ///
    /// `ClientRejected` is retryable here; callers may opt into treating it
    /// as fatal. Everything else stops the run.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::CapacityUnavailable | Self::TransientRemote | Self::ClientRejected
        )
    }
}

/// Tagged result of one launch attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T> {
    /// The provider accepted the launch request
    Success(T),
    /// Sleep and try again
    RetryableFailure {
        kind: ErrorKind,
        reason: String,
        status: Option<u16>,
        code: Option<String>,
    },
    /// Stop without further attempts
    FatalFailure { kind: ErrorKind, reason: String },
}

impl<T> AttemptOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Classified kind of a failed attempt, None on success.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::RetryableFailure { kind, .. } | Self::FatalFailure { kind, .. } => Some(*kind),
        }
    }
}
