//! OCI client modules
//!
//! This module provides a minimal OCI REST client for:
//! - profile: Reading the OCI config file
//! - signer: HTTP Signature request signing
//! - compute: Listing and launching instances
//! - error: Classifying service errors for retry decisions

pub mod compute;
pub mod context;
pub mod error;
pub mod profile;
pub mod signer;

pub use compute::{
    ComputeClient, ComputeOperations, InstanceSummary, LaunchInstanceDetails, LaunchedInstance,
};
pub use context::OciContext;
pub use error::{OciError, ServiceError, classify_service_error};
pub use profile::OciProfile;
pub use signer::RequestSigner;
