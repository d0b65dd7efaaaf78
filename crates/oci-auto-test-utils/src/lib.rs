//! Shared test utilities for oci-auto
//!
//! This crate provides common test helpers that can be used across
//! unit and integration tests without circular dependencies.
//!
//! ## Modules
//!
//! - [`keys`]: Fixed RSA key material for request signing
//! - [`profile`]: OCI config file fixtures written to temp directories
//! - [`instances`]: JSON builders for compute API instance records

pub mod instances;
pub mod keys;
pub mod profile;

// Re-export commonly used items
pub use instances::{a1_instance_json, instance_json, out_of_capacity_body, test_compartment_id};
pub use keys::{TEST_FINGERPRINT, TEST_PRIVATE_KEY_PKCS1, TEST_PRIVATE_KEY_PKCS8};
pub use profile::TestProfile;
