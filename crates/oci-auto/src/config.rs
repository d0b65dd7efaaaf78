//! Settings for a launch run
//!
//! Built once at startup from CLI arguments (with environment and `.env`
//! fallbacks) and passed by reference into the auditor and the retrier.

use crate::error::ConfigError;
use garde::Validate;
use oci_auto_common::defaults::CPU_CEILING;
use oci_auto_common::memory_for_ocpus;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// The instance being requested
#[derive(Debug, Clone, Validate)]
pub struct InstanceSettings {
    /// Display name of the new instance
    #[garde(length(min = 1))]
    pub display_name: String,
    /// OCPUs to request (never more than the free-tier ceiling)
    #[garde(range(min = 1, max = CPU_CEILING))]
    pub ocpus: u32,
    /// SSH public key placed in instance metadata
    #[garde(length(min = 1))]
    pub ssh_public_key: String,
    /// Free-form tags applied to the instance (empty by default)
    #[garde(skip)]
    pub freeform_tags: BTreeMap<String, String>,
}

impl InstanceSettings {
    /// Memory follows OCPUs on the flex shape.
    pub fn memory_gb(&self) -> u32 {
        memory_for_ocpus(self.ocpus)
    }
}

/// Where the instance goes
#[derive(Debug, Clone, Validate)]
pub struct PlacementSettings {
    /// Compartment OCID (also the scope of the quota audit)
    #[garde(length(min = 1))]
    pub compartment_id: String,
    /// Availability domain name
    #[garde(length(min = 1))]
    pub availability_domain: String,
    /// Boot image OCID
    #[garde(length(min = 1))]
    pub image_id: String,
    /// Subnet OCID for the primary VNIC
    #[garde(length(min = 1))]
    pub subnet_id: String,
}

/// Retry loop behavior
#[derive(Debug, Clone, Validate)]
pub struct RetrySettings {
    /// Seconds to wait between attempts
    #[garde(range(min = 1))]
    pub wait_secs: u64,
    /// Stop on 4xx client errors instead of retrying them
    #[garde(skip)]
    pub fail_on_client_error: bool,
}

impl RetrySettings {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

/// OCI credential source
#[derive(Debug, Clone, Validate)]
pub struct OciSettings {
    /// Path to the OCI config file
    #[garde(skip)]
    pub config_file: PathBuf,
    /// Profile section within the config file
    #[garde(length(min = 1))]
    pub profile: String,
    /// Override for the regional compute endpoint
    #[garde(skip)]
    pub endpoint: Option<String>,
}

/// Complete, immutable settings for one run
#[derive(Debug, Clone, Validate)]
pub struct Settings {
    #[garde(dive)]
    pub instance: InstanceSettings,
    #[garde(dive)]
    pub placement: PlacementSettings,
    #[garde(dive)]
    pub retry: RetrySettings,
    #[garde(dive)]
    pub oci: OciSettings,
    /// Append-only log file
    #[garde(skip)]
    pub log_file: PathBuf,
}

impl Settings {
    /// Validate and return the settings, or a configuration error.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    pub fn display_name(&self) -> &str {
        &self.instance.display_name
    }
    pub fn ocpus(&self) -> u32 {
        self.instance.ocpus
    }
    pub fn memory_gb(&self) -> u32 {
        self.instance.memory_gb()
    }
    pub fn compartment_id(&self) -> &str {
        &self.placement.compartment_id
    }
    pub fn wait(&self) -> Duration {
        self.retry.wait()
    }
}
