//! oci-auto-common - Shared types and constants
//!
//! This crate holds the pieces of oci-auto that carry no HTTP or signing
//! dependencies, so they can be shared by the launcher and its test helpers.
//!
//! ## Modules
//!
//! - [`defaults`]: Free-tier ceilings, target shape, and default settings
//! - [`lifecycle`]: Provider-reported instance lifecycle states
//! - [`outcome`]: Error-kind taxonomy and the result of one launch attempt

pub mod defaults;
pub mod lifecycle;
pub mod outcome;

// Re-export commonly used types
pub use lifecycle::LifecycleState;
pub use outcome::{AttemptOutcome, ErrorKind};

/// Memory allocated for a given OCPU count on the flex shape.
#[inline]
pub fn memory_for_ocpus(ocpus: u32) -> u32 {
    ocpus.saturating_mul(defaults::MEMORY_GB_PER_OCPU)
}
