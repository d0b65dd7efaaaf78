//! Command-line arguments
//!
//! Every setting is a long flag with an environment fallback, so a `.env`
//! file in the working directory can carry the whole configuration.

use crate::config::{InstanceSettings, OciSettings, PlacementSettings, RetrySettings, Settings};
use crate::orchestrator::OutputFormat;
use clap::{Parser, Subcommand};
use oci_auto_common::defaults::{DEFAULT_LOG_FILE, DEFAULT_OCI_CONFIG_FILE, DEFAULT_OCI_PROFILE};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oci-auto")]
#[command(about = "Keep retrying an OCI Ampere A1 instance launch until capacity frees up")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Audit quota, then retry the launch until it succeeds
    Launch {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Run the audit and print the launch request without sending it
        #[arg(long)]
        dry_run: bool,

        /// Stop on 4xx client errors instead of retrying them
        #[arg(long)]
        fail_on_client_error: bool,
    },

    /// Run only the quota audit
    Audit {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

impl Command {
    pub fn settings(&self) -> &SettingsArgs {
        match self {
            Command::Launch { settings, .. } | Command::Audit { settings, .. } => settings,
        }
    }
}

/// Settings shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct SettingsArgs {
    /// OCPUs for the new instance (memory is 6 GB per OCPU)
    #[arg(long, env = "OCPUS")]
    pub ocpus: u32,

    /// Seconds to wait between launch attempts
    #[arg(long = "wait", env = "WAIT_S_FOR_RETRY")]
    pub wait_secs: u64,

    /// Display name of the new instance
    #[arg(long, env = "INSTANCE_DISPLAY_NAME")]
    pub display_name: String,

    /// Compartment OCID
    #[arg(long, env = "COMPARTMENT_ID")]
    pub compartment_id: String,

    /// Availability domain, e.g. "Uocm:EU-FRANKFURT-1-AD-1"
    #[arg(long = "domain", env = "DOMAIN")]
    pub availability_domain: String,

    /// Boot image OCID
    #[arg(long, env = "IMAGE_ID")]
    pub image_id: String,

    /// Subnet OCID
    #[arg(long, env = "SUBNET_ID")]
    pub subnet_id: String,

    /// SSH public key placed on the instance
    #[arg(long, env = "SSH_KEY")]
    pub ssh_key: String,

    /// Free-form tag as KEY=VALUE (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// OCI config file
    #[arg(long, env = "OCI_CONFIG_FILE", default_value = DEFAULT_OCI_CONFIG_FILE)]
    pub oci_config_file: PathBuf,

    /// Profile within the OCI config file
    #[arg(long, env = "OCI_PROFILE", default_value = DEFAULT_OCI_PROFILE)]
    pub oci_profile: String,

    /// Override the compute endpoint (defaults to the profile's region)
    #[arg(long, env = "OCI_ENDPOINT")]
    pub oci_endpoint: Option<String>,

    /// Log file, appended to
    #[arg(long, env = "OCI_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

impl SettingsArgs {
    /// Build unvalidated settings; call [`Settings::validated`] next.
    pub fn into_settings(self, fail_on_client_error: bool) -> Settings {
        Settings {
            instance: InstanceSettings {
                display_name: self.display_name,
                ocpus: self.ocpus,
                ssh_public_key: self.ssh_key,
                freeform_tags: self.tags.into_iter().collect::<BTreeMap<_, _>>(),
            },
            placement: PlacementSettings {
                compartment_id: self.compartment_id,
                availability_domain: self.availability_domain,
                image_id: self.image_id,
                subnet_id: self.subnet_id,
            },
            retry: RetrySettings {
                wait_secs: self.wait_secs,
                fail_on_client_error,
            },
            oci: OciSettings {
                config_file: self.oci_config_file,
                profile: self.oci_profile,
                endpoint: self.oci_endpoint,
            },
            log_file: self.log_file,
        }
    }
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

impl Args {
    /// Consume the arguments into validated-later settings plus the command.
    pub fn into_parts(self) -> (Settings, Command) {
        let fail_on_client_error = matches!(
            self.command,
            Command::Launch {
                fail_on_client_error: true,
                ..
            }
        );
        let settings = self
            .command
            .settings()
            .clone()
            .into_settings(fail_on_client_error);
        (settings, self.command)
    }
}
