//! Pre-flight quota audit
//!
//! Lists the compartment's instances, totals what the target shape family
//! already uses, and decides whether the requested instance still fits in
//! the free-tier ceiling under a display name nobody else has.
//!
//! The audit is read-only and is never retried: a failing list call is
//! returned to the caller as-is.

use crate::error::PrecheckError;
use crate::launch::ResourceRequest;
use crate::oci::{ComputeOperations, InstanceSummary, OciError};
use oci_auto_common::defaults::{CPU_CEILING, MEMORY_CEILING_GB};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

/// Account-wide allocation for the shape family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaCeiling {
    pub cpu: u32,
    pub memory_gb: u32,
}

impl Default for QuotaCeiling {
    fn default() -> Self {
        Self {
            cpu: CPU_CEILING,
            memory_gb: MEMORY_CEILING_GB,
        }
    }
}

/// Current usage of the target shape, recomputed on every audit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountUsageSnapshot {
    /// Non-terminal instances of the target shape
    pub instance_count: u32,
    pub total_cpu: u64,
    pub total_memory_gb: u64,
    /// Display names of every listed instance, any shape or state
    pub display_names: BTreeSet<String>,
}

impl AccountUsageSnapshot {
    /// Aggregate usage of `shape` over a list of instances.
    pub fn from_instances(instances: &[InstanceSummary], shape: &str) -> Self {
        let mut snapshot = Self::default();

        for instance in instances {
            snapshot
                .display_names
                .insert(instance.display_name.clone());

            if instance.shape == shape && !instance.lifecycle_state.is_terminal() {
                snapshot.instance_count += 1;
                snapshot.total_cpu += u64::from(instance.ocpus());
                snapshot.total_memory_gb += u64::from(instance.memory_gb());
            }
        }

        snapshot
    }

    pub fn free_cpu(&self, ceiling: &QuotaCeiling) -> i64 {
        remaining(ceiling.cpu, self.total_cpu)
    }

    pub fn free_memory_gb(&self, ceiling: &QuotaCeiling) -> i64 {
        remaining(ceiling.memory_gb, self.total_memory_gb)
    }

    /// Decide whether `request` may be launched on top of this usage.
    ///
    /// Quota is checked first, then the display name (exact, case-sensitive).
    /// Sums are taken in `u64`, so no request can wrap back under the ceiling.
    pub fn evaluate(
        &self,
        request: &ResourceRequest,
        ceiling: &QuotaCeiling,
    ) -> Result<(), PrecheckError> {
        let total_cpu = self.total_cpu.saturating_add(u64::from(request.ocpus()));
        let total_memory = self
            .total_memory_gb
            .saturating_add(u64::from(request.memory_gb()));

        if total_cpu > u64::from(ceiling.cpu) || total_memory > u64::from(ceiling.memory_gb) {
            return Err(PrecheckError::QuotaExceeded {
                total_cpu,
                total_memory,
                cpu_ceiling: ceiling.cpu,
                memory_ceiling: ceiling.memory_gb,
            });
        }

        if self.display_names.contains(request.display_name()) {
            return Err(PrecheckError::DuplicateName(
                request.display_name().to_string(),
            ));
        }

        Ok(())
    }
}

fn remaining(ceiling: u32, used: u64) -> i64 {
    i64::from(ceiling).saturating_sub(i64::try_from(used).unwrap_or(i64::MAX))
}

/// Result of one audit: what was found and the pass/fail decision
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub instances: Vec<InstanceSummary>,
    pub snapshot: AccountUsageSnapshot,
    pub ceiling: QuotaCeiling,
    #[serde(serialize_with = "serialize_decision")]
    pub decision: Result<(), PrecheckError>,
}

impl AuditReport {
    pub fn passed(&self) -> bool {
        self.decision.is_ok()
    }

    /// Turn a failing decision into an error.
    pub fn into_result(self) -> Result<Self, PrecheckError> {
        match &self.decision {
            Ok(()) => Ok(self),
            Err(e) => Err(e.clone()),
        }
    }
}

fn serialize_decision<S>(decision: &Result<(), PrecheckError>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match decision {
        Ok(()) => s.serialize_str("pass"),
        Err(e) => s.serialize_str(&format!("fail: {e}")),
    }
}

/// Runs the pre-flight quota audit
pub struct QuotaAuditor<'a, C> {
    compute: &'a C,
    ceiling: QuotaCeiling,
}

impl<'a, C: ComputeOperations> QuotaAuditor<'a, C> {
    pub fn new(compute: &'a C) -> Self {
        Self::with_ceiling(compute, QuotaCeiling::default())
    }

    pub fn with_ceiling(compute: &'a C, ceiling: QuotaCeiling) -> Self {
        Self { compute, ceiling }
    }

    /// List the compartment, aggregate usage, and decide.
    pub async fn audit(&self, request: &ResourceRequest) -> Result<AuditReport, OciError> {
        info!("Check current instances in account");
        info!(
            "Note: Free up to {} OCPUs and {} GB of memory in total for {}",
            self.ceiling.cpu,
            self.ceiling.memory_gb,
            request.shape()
        );

        let instances = self.compute.list_instances(request.compartment_id()).await?;

        if instances.is_empty() {
            info!("No instance(s) found!");
        } else {
            info!(count = instances.len(), "{} instance(s) found!", instances.len());
            for instance in &instances {
                info!(
                    name = %instance.display_name,
                    shape = %instance.shape,
                    ocpus = instance.ocpus(),
                    memory_gb = instance.memory_gb(),
                    state = %instance.lifecycle_state,
                    "{} - {} - {} ocpu(s) - {} GB(s) | State: {}",
                    instance.display_name,
                    instance.shape,
                    instance.ocpus(),
                    instance.memory_gb(),
                    instance.lifecycle_state
                );
            }
        }

        let snapshot = AccountUsageSnapshot::from_instances(&instances, request.shape());
        info!(
            "Current: {} active {} instance(s) (including RUNNING OR STOPPED)",
            snapshot.instance_count,
            request.shape()
        );
        info!(
            total_cpu = snapshot.total_cpu,
            total_memory_gb = snapshot.total_memory_gb,
            "Total ocpus: {} - Total memory: {} (GB) || Free {} ocpus - Free memory: {} (GB)",
            snapshot.total_cpu,
            snapshot.total_memory_gb,
            snapshot.free_cpu(&self.ceiling),
            snapshot.free_memory_gb(&self.ceiling)
        );

        let decision = snapshot.evaluate(request, &self.ceiling);
        if decision.is_ok() {
            info!(
                "Precheck pass! Create new instance {}: {} ocpus - {} GB",
                request.shape(),
                request.ocpus(),
                request.memory_gb()
            );
        }

        Ok(AuditReport {
            instances,
            snapshot,
            ceiling: self.ceiling,
            decision,
        })
    }
}
