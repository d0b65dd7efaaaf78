//! Shared OCI configuration context
//!
//! Provides `OciContext` for loading the OCI profile and signing key once
//! and creating service clients from it.

use crate::config::OciSettings;
use crate::error::ConfigError;
use crate::oci::profile::OciProfile;
use crate::oci::signer::RequestSigner;
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

/// Shared OCI configuration context for creating service clients.
///
/// # Example
/// ```ignore
/// let oci = OciContext::load(&settings.oci)?;
/// let compute = ComputeClient::from_context(&oci)?;
/// ```
#[derive(Clone)]
pub struct OciContext {
    profile: Arc<OciProfile>,
    signer: Arc<RequestSigner>,
    endpoint: Url,
}

impl OciContext {
    /// Load the profile, its signing key, and resolve the compute endpoint.
    pub fn load(settings: &OciSettings) -> Result<Self, ConfigError> {
        let profile = OciProfile::load(&settings.config_file, &settings.profile)?;
        let signer = RequestSigner::from_profile(&profile)?;
        let endpoint = resolve_endpoint(settings.endpoint.as_deref(), &profile.region)?;

        debug!(
            region = %profile.region,
            endpoint = %endpoint,
            key_id = %signer.key_id(),
            "Loaded OCI profile"
        );

        Ok(Self {
            profile: Arc::new(profile),
            signer: Arc::new(signer),
            endpoint,
        })
    }

    pub fn region(&self) -> &str {
        &self.profile.region
    }

    pub fn profile(&self) -> &OciProfile {
        &self.profile
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn signer(&self) -> Arc<RequestSigner> {
        Arc::clone(&self.signer)
    }
}

impl std::fmt::Debug for OciContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OciContext")
            .field("region", &self.profile.region)
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// Regional Core Services endpoint, unless overridden.
fn resolve_endpoint(endpoint: Option<&str>, region: &str) -> Result<Url, ConfigError> {
    let raw = match endpoint {
        Some(e) => e.to_string(),
        None => format!("https://iaas.{region}.oraclecloud.com"),
    };
    Url::parse(&raw).map_err(|_| ConfigError::InvalidEndpoint(raw))
}
