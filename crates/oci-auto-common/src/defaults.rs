//! Default configuration values and free-tier limits
//!
//! The ceilings describe the account-wide Always Free allocation for the
//! Ampere A1 flex shape family.

/// Compute shape this tool launches
pub const SHAPE: &str = "VM.Standard.A1.Flex";

/// Fixed memory per OCPU on the A1 flex shape (GB)
pub const MEMORY_GB_PER_OCPU: u32 = 6;

/// Account-wide OCPU ceiling for the shape family
pub const CPU_CEILING: u32 = 4;

/// Account-wide memory ceiling for the shape family (GB)
pub const MEMORY_CEILING_GB: u32 = 24;

/// Default OCI config file location
pub const DEFAULT_OCI_CONFIG_FILE: &str = "./config";

/// Default OCI config profile
pub const DEFAULT_OCI_PROFILE: &str = "DEFAULT";

/// Default append-only log file
pub const DEFAULT_LOG_FILE: &str = "oci.log";

/// OCI Core Services API version prefix
pub const API_VERSION: &str = "20160918";

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Page size for list-instances requests
pub const LIST_PAGE_LIMIT: u32 = 100;

/// Instance agent plugins and their desired states on launch
pub const AGENT_PLUGINS: &[(&str, &str)] = &[
    ("Vulnerability Scanning", "DISABLED"),
    ("Compute Instance Monitoring", "ENABLED"),
    ("Bastion", "DISABLED"),
];

/// Recovery action requested for the launched instance
pub const RECOVERY_ACTION: &str = "RESTORE_INSTANCE";
