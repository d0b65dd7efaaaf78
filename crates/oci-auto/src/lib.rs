//! oci-auto - capacity-constrained instance launch retrier for OCI
//!
//! Audits the compartment's Ampere A1 usage against the free-tier ceiling,
//! then keeps sending the same launch request at a fixed interval until a
//! host with capacity accepts it.

pub mod cli;
pub mod config;
pub mod error;
pub mod launch;
pub mod log_capture;
pub mod logging;
pub mod oci;
pub mod orchestrator;
pub mod quota;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::{ConfigError, PrecheckError};
use crate::launch::LaunchError;
use crate::oci::OciError;
use oci_auto_common::ErrorKind;

/// Exit code for a failed quota precheck
pub const EXIT_PRECHECK_FAILED: i32 = 3;
/// Exit code for any other fatal error
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for a fatal error
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<PrecheckError>().is_some() {
        EXIT_PRECHECK_FAILED
    } else {
        EXIT_FAILURE
    }
}

/// Classified kind of a fatal error, if it came from this crate
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    if let Some(e) = err.downcast_ref::<PrecheckError>() {
        return Some(e.kind());
    }
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return Some(e.kind());
    }
    if let Some(e) = err.downcast_ref::<LaunchError>() {
        return Some(e.kind());
    }
    err.downcast_ref::<OciError>().map(OciError::kind)
}

/// User-facing hint for resolving a fatal error
pub fn suggestion(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<LaunchError>() {
        return e.suggestion();
    }
    if let Some(e) = err.downcast_ref::<OciError>() {
        return e.suggestion();
    }
    match err.downcast_ref::<PrecheckError>()? {
        PrecheckError::QuotaExceeded { .. } => {
            Some("Lower OCPUS, or terminate an A1 instance you no longer need.")
        }
        PrecheckError::DuplicateName(_) => Some("Pick another INSTANCE_DISPLAY_NAME."),
    }
}
