//! Compute operations trait for testing

use super::ComputeClient;
use super::types::{InstanceSummary, LaunchInstanceDetails, LaunchedInstance};
use crate::oci::error::OciError;

/// Trait for the compute operations the launcher needs.
///
/// This trait abstracts the compute client so the quota audit and the
/// launch loop can be unit tested without hitting OCI.
#[allow(async_fn_in_trait)] // Internal use only, single-threaded callers
pub trait ComputeOperations {
    /// List every instance in a compartment, following pagination
    async fn list_instances(&self, compartment_id: &str) -> Result<Vec<InstanceSummary>, OciError>;

    /// Submit one launch request
    async fn launch_instance(
        &self,
        details: &LaunchInstanceDetails,
    ) -> Result<LaunchedInstance, OciError>;

    /// Release the HTTP session.
    ///
    /// Returns true only for the call that actually released it.
    fn close(&self) -> bool;
}

impl ComputeOperations for ComputeClient {
    async fn list_instances(&self, compartment_id: &str) -> Result<Vec<InstanceSummary>, OciError> {
        ComputeClient::list_instances(self, compartment_id).await
    }

    async fn launch_instance(
        &self,
        details: &LaunchInstanceDetails,
    ) -> Result<LaunchedInstance, OciError> {
        ComputeClient::launch_instance(self, details).await
    }

    fn close(&self) -> bool {
        ComputeClient::close(self)
    }
}
