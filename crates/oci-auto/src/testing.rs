//! Scripted compute fake for unit tests

use crate::oci::{
    ComputeOperations, InstanceSummary, LaunchInstanceDetails, LaunchedInstance, OciError,
    classify_service_error,
};
use oci_auto_common::LifecycleState;
use oci_auto_test_utils::instance_json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Instance summary built from the shared JSON fixture
pub fn summary(
    name: &str,
    shape: &str,
    ocpus: u32,
    memory_gb: u32,
    state: &str,
) -> InstanceSummary {
    serde_json::from_value(instance_json(name, shape, ocpus as f32, memory_gb as f32, state))
        .expect("fixture deserializes")
}

pub fn capacity_error() -> OciError {
    classify_service_error(
        500,
        Some("InternalError"),
        Some("Out of host capacity."),
        Some("req-capacity"),
    )
}

pub fn client_error() -> OciError {
    classify_service_error(
        400,
        Some("InvalidParameter"),
        Some("Invalid subnetId"),
        Some("req-client"),
    )
}

pub fn launched(name: &str) -> LaunchedInstance {
    LaunchedInstance {
        id: format!("ocid1.instance.oc1..{name}"),
        display_name: name.to_string(),
        lifecycle_state: LifecycleState::Provisioning,
        request_id: Some("req-success".to_string()),
    }
}

enum Scripted {
    Respond(Result<LaunchedInstance, OciError>),
    Hang,
}

/// Compute fake answering launches from a script
///
/// Once the script runs out, launches fail with the repeat error if one
/// is set, and never complete otherwise.
#[derive(Default)]
pub struct FakeCompute {
    instances: Vec<InstanceSummary>,
    list_error: Option<fn() -> OciError>,
    script: Mutex<VecDeque<Scripted>>,
    repeat: Option<fn() -> OciError>,
    last_details: Mutex<Option<LaunchInstanceDetails>>,
    list_calls: AtomicUsize,
    launch_calls: AtomicUsize,
    close_calls: AtomicUsize,
    releases: AtomicUsize,
    closed: AtomicBool,
}

impl FakeCompute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instances(mut self, instances: Vec<InstanceSummary>) -> Self {
        self.instances = instances;
        self
    }

    pub fn with_list_error(mut self, error: fn() -> OciError) -> Self {
        self.list_error = Some(error);
        self
    }

    /// Answer the next launch with `result`.
    pub fn then(self, result: Result<LaunchedInstance, OciError>) -> Self {
        self.push(Scripted::Respond(result));
        self
    }

    /// Fail the next `n` launches with "Out of host capacity".
    pub fn then_capacity_failures(self, n: usize) -> Self {
        for _ in 0..n {
            self.push(Scripted::Respond(Err(capacity_error())));
        }
        self
    }

    /// Leave the next launch in flight forever.
    pub fn then_hang(self) -> Self {
        self.push(Scripted::Hang);
        self
    }

    /// Fail every launch past the end of the script with `error`.
    pub fn repeating(mut self, error: fn() -> OciError) -> Self {
        self.repeat = Some(error);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn launch_calls(&self) -> usize {
        self.launch_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Number of close calls that actually released the session
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn last_details(&self) -> Option<LaunchInstanceDetails> {
        self.last_details.lock().unwrap().clone()
    }

    fn push(&self, step: Scripted) {
        self.script.lock().unwrap().push_back(step);
    }
}

impl ComputeOperations for FakeCompute {
    async fn list_instances(
        &self,
        _compartment_id: &str,
    ) -> Result<Vec<InstanceSummary>, OciError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match self.list_error {
            Some(error) => Err(error()),
            None => Ok(self.instances.clone()),
        }
    }

    async fn launch_instance(
        &self,
        details: &LaunchInstanceDetails,
    ) -> Result<LaunchedInstance, OciError> {
        self.launch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_details.lock().unwrap() = Some(details.clone());

        if self.closed.load(Ordering::SeqCst) {
            return Err(OciError::SessionClosed);
        }

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Scripted::Respond(result)) => result,
            Some(Scripted::Hang) => std::future::pending().await,
            None => match self.repeat {
                Some(error) => Err(error()),
                None => std::future::pending().await,
            },
        }
    }

    fn close(&self) -> bool {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let released = !self.closed.swap(true, Ordering::SeqCst);
        if released {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
        released
    }
}
