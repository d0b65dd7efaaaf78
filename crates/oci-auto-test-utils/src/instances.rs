//! JSON builders for compute API instance records

use oci_auto_common::defaults::SHAPE;
use serde_json::{Value, json};

/// Compartment OCID used across tests
pub fn test_compartment_id() -> String {
    "ocid1.compartment.oc1..aaaatestcompartment".to_string()
}

/// Build an instance record as returned by `ListInstances`.
pub fn instance_json(name: &str, shape: &str, ocpus: f32, memory_gb: f32, state: &str) -> Value {
    json!({
        "id": format!("ocid1.instance.oc1..{}", name.to_lowercase()),
        "displayName": name,
        "shape": shape,
        "lifecycleState": state,
        "compartmentId": test_compartment_id(),
        "availabilityDomain": "Uocm:EU-FRANKFURT-1-AD-1",
        "shapeConfig": {
            "ocpus": ocpus,
            "memoryInGBs": memory_gb
        }
    })
}

/// Build a running A1 flex instance record.
pub fn a1_instance_json(name: &str, ocpus: f32) -> Value {
    instance_json(name, SHAPE, ocpus, ocpus * 6.0, "RUNNING")
}

/// Body of the "Out of host capacity" service error.
pub fn out_of_capacity_body() -> Value {
    json!({
        "code": "InternalError",
        "message": "Out of host capacity."
    })
}
