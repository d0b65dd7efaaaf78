//! Compute API request and response types

use oci_auto_common::LifecycleState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instance record returned by `ListInstances`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    #[serde(default)]
    pub id: String,
    pub display_name: String,
    pub shape: String,
    pub lifecycle_state: LifecycleState,
    #[serde(default)]
    pub shape_config: Option<InstanceShapeConfig>,
}

/// Allocated resources of an instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceShapeConfig {
    #[serde(default)]
    pub ocpus: Option<f32>,
    #[serde(rename = "memoryInGBs", default)]
    pub memory_in_gbs: Option<f32>,
}

impl InstanceSummary {
    /// Whole OCPUs allocated (fractions are truncated)
    pub fn ocpus(&self) -> u32 {
        self.shape_config
            .as_ref()
            .and_then(|c| c.ocpus)
            .map_or(0, |v| v as u32)
    }

    /// Whole GB of memory allocated (fractions are truncated)
    pub fn memory_gb(&self) -> u32 {
        self.shape_config
            .as_ref()
            .and_then(|c| c.memory_in_gbs)
            .map_or(0, |v| v as u32)
    }
}

/// Instance returned by `LaunchInstance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchedInstance {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub lifecycle_state: LifecycleState,
    /// `opc-request-id` of the accepted request
    #[serde(skip)]
    pub request_id: Option<String>,
}

/// Body of a `LaunchInstance` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchInstanceDetails {
    pub availability_domain: String,
    pub compartment_id: String,
    pub display_name: String,
    pub shape: String,
    pub shape_config: LaunchShapeConfig,
    pub source_details: SourceDetails,
    pub create_vnic_details: CreateVnicDetails,
    pub metadata: BTreeMap<String, String>,
    pub agent_config: AgentConfig,
    pub defined_tags: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    /// Free-form tags; empty unless configured
    pub freeform_tags: BTreeMap<String, String>,
    pub instance_options: InstanceOptions,
    pub availability_config: AvailabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchShapeConfig {
    pub ocpus: f32,
    #[serde(rename = "memoryInGBs")]
    pub memory_in_gbs: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDetails {
    pub source_type: String,
    pub image_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVnicDetails {
    pub assign_public_ip: bool,
    pub subnet_id: String,
    pub assign_private_dns_record: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub is_monitoring_disabled: bool,
    pub is_management_disabled: bool,
    pub plugins_config: Vec<PluginConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    pub name: String,
    pub desired_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceOptions {
    pub are_legacy_imds_endpoints_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityConfig {
    pub recovery_action: String,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_list_record() {
        let json = r#"{
            "id": "ocid1.instance.oc1..a",
            "displayName": "worker-1",
            "shape": "VM.Standard.A1.Flex",
            "lifecycleState": "STOPPED",
            "shapeConfig": { "ocpus": 2.0, "memoryInGBs": 12.0, "gpus": 0 },
            "timeCreated": "2024-01-01T00:00:00Z"
        }"#;
        let instance: InstanceSummary = serde_json::from_str(json).unwrap();
        assert_eq!(instance.display_name, "worker-1");
        assert_eq!(instance.lifecycle_state, LifecycleState::Stopped);
        assert_eq!(instance.ocpus(), 2);
        assert_eq!(instance.memory_gb(), 12);
    }

    #[test]
    fn missing_shape_config_counts_as_zero() {
        let json = r#"{
            "displayName": "legacy",
            "shape": "VM.Standard.E2.1.Micro",
            "lifecycleState": "RUNNING"
        }"#;
        let instance: InstanceSummary = serde_json::from_str(json).unwrap();
        assert_eq!(instance.ocpus(), 0);
        assert_eq!(instance.memory_gb(), 0);
    }

    #[test]
    fn fractional_resources_truncate() {
        let instance = InstanceSummary {
            id: String::new(),
            display_name: "x".to_string(),
            shape: "VM.Standard.A1.Flex".to_string(),
            lifecycle_state: LifecycleState::Running,
            shape_config: Some(InstanceShapeConfig {
                ocpus: Some(1.5),
                memory_in_gbs: Some(9.9),
            }),
        };
        assert_eq!(instance.ocpus(), 1);
        assert_eq!(instance.memory_gb(), 9);
    }
}
