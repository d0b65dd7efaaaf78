//! The requested instance and its launch specification

use crate::config::Settings;
use crate::oci::compute::{
    AgentConfig, AvailabilityConfig, CreateVnicDetails, InstanceOptions, LaunchInstanceDetails,
    LaunchShapeConfig, PluginConfig, SourceDetails,
};
use oci_auto_common::defaults::{AGENT_PLUGINS, RECOVERY_ACTION, SHAPE};
use std::collections::BTreeMap;

/// Desired compute instance, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    shape: String,
    ocpus: u32,
    memory_gb: u32,
    display_name: String,
    compartment_id: String,
    availability_domain: String,
    image_id: String,
    subnet_id: String,
    ssh_public_key: String,
    freeform_tags: BTreeMap<String, String>,
}

impl ResourceRequest {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            shape: SHAPE.to_string(),
            ocpus: settings.instance.ocpus,
            memory_gb: settings.instance.memory_gb(),
            display_name: settings.instance.display_name.clone(),
            compartment_id: settings.placement.compartment_id.clone(),
            availability_domain: settings.placement.availability_domain.clone(),
            image_id: settings.placement.image_id.clone(),
            subnet_id: settings.placement.subnet_id.clone(),
            ssh_public_key: settings.instance.ssh_public_key.clone(),
            freeform_tags: settings.instance.freeform_tags.clone(),
        }
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }
    pub fn ocpus(&self) -> u32 {
        self.ocpus
    }
    pub fn memory_gb(&self) -> u32 {
        self.memory_gb
    }
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
    pub fn compartment_id(&self) -> &str {
        &self.compartment_id
    }
    pub fn freeform_tags(&self) -> &BTreeMap<String, String> {
        &self.freeform_tags
    }

    /// Build the `LaunchInstance` request body.
    ///
    /// The VNIC gets no public IP and a private DNS record; the recovery
    /// action restores the instance after host maintenance.
    pub fn launch_details(&self) -> LaunchInstanceDetails {
        LaunchInstanceDetails {
            availability_domain: self.availability_domain.clone(),
            compartment_id: self.compartment_id.clone(),
            display_name: self.display_name.clone(),
            shape: self.shape.clone(),
            shape_config: LaunchShapeConfig {
                ocpus: self.ocpus as f32,
                memory_in_gbs: self.memory_gb as f32,
            },
            source_details: SourceDetails {
                source_type: "image".to_string(),
                image_id: self.image_id.clone(),
            },
            create_vnic_details: CreateVnicDetails {
                assign_public_ip: false,
                subnet_id: self.subnet_id.clone(),
                assign_private_dns_record: true,
            },
            metadata: BTreeMap::from([(
                "ssh_authorized_keys".to_string(),
                self.ssh_public_key.clone(),
            )]),
            agent_config: AgentConfig {
                is_monitoring_disabled: false,
                is_management_disabled: false,
                plugins_config: AGENT_PLUGINS
                    .iter()
                    .map(|(name, state)| PluginConfig {
                        name: name.to_string(),
                        desired_state: state.to_string(),
                    })
                    .collect(),
            },
            defined_tags: BTreeMap::new(),
            freeform_tags: self.freeform_tags.clone(),
            instance_options: InstanceOptions {
                are_legacy_imds_endpoints_disabled: false,
            },
            availability_config: AvailabilityConfig {
                recovery_action: RECOVERY_ACTION.to_string(),
            },
        }
    }
}
