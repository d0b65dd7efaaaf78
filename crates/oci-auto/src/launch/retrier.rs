//! Constant-interval launch loop
//!
//! One launch request at a time, classified right after it returns, then
//! either done or a fixed sleep before the next one. Runs until the
//! provider accepts the request, a fatal error, or operator cancellation.

use super::ResourceRequest;
use crate::oci::{ComputeOperations, LaunchInstanceDetails, LaunchedInstance, OciError};
use backon::{BackoffBuilder, ConstantBuilder};
use oci_auto_common::{AttemptOutcome, ErrorKind};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const SUCCESS_MESSAGE: &str = "Success! Edit vnic to get public ip address";

/// Launch loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LaunchState {
    Idle,
    Attempting,
    RetryWaiting,
    Succeeded,
    /// Operator cancellation
    Aborted,
    /// Client error with `fail_on_client_error` set
    Failed,
}

impl LaunchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Aborted | Self::Failed)
    }

    pub fn can_transition_to(self, next: LaunchState) -> bool {
        use LaunchState::*;
        matches!(
            (self, next),
            (Idle, Attempting)
                | (Attempting, Succeeded)
                | (Attempting, RetryWaiting)
                | (Attempting, Aborted)
                | (Attempting, Failed)
                | (RetryWaiting, Attempting)
                | (RetryWaiting, Aborted)
        )
    }
}

/// How a launch loop ended
#[derive(Debug, Clone, Serialize)]
pub struct LaunchReport {
    pub state: LaunchState,
    /// Requests sent, including one cut short by cancellation
    pub attempts: u64,
    /// Wait intervals entered
    pub waits: u64,
    pub instance: Option<LaunchedInstance>,
}

impl LaunchReport {
    pub fn succeeded(&self) -> bool {
        self.state == LaunchState::Succeeded
    }

    pub fn aborted(&self) -> bool {
        self.state == LaunchState::Aborted
    }
}

/// Fatal launch failure
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Launch rejected on attempt {attempt}: {reason}")]
    Rejected {
        attempt: u64,
        kind: ErrorKind,
        reason: String,
        suggestion: Option<&'static str>,
    },
}

impl LaunchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected { kind, .. } => *kind,
        }
    }

    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Rejected { suggestion, .. } => *suggestion,
        }
    }
}

/// Classify one launch result.
///
/// Retryable kinds are retried, except client rejections when
/// `fail_on_client_error` is set.
pub fn classify_attempt(
    result: Result<LaunchedInstance, OciError>,
    fail_on_client_error: bool,
) -> AttemptOutcome<LaunchedInstance> {
    let err = match result {
        Ok(instance) => return AttemptOutcome::Success(instance),
        Err(e) => e,
    };

    let kind = err.kind();
    let fatal_rejection = kind == ErrorKind::ClientRejected && fail_on_client_error;
    if !kind.is_retryable() || fatal_rejection {
        return AttemptOutcome::FatalFailure {
            kind,
            reason: err.to_string(),
        };
    }

    AttemptOutcome::RetryableFailure {
        kind,
        reason: err.message(),
        status: err.status(),
        code: err.code().map(str::to_string),
    }
}

/// Drives launch attempts until a terminal state
pub struct LaunchRetrier<'a, C> {
    compute: &'a C,
    details: LaunchInstanceDetails,
    wait: Duration,
    fail_on_client_error: bool,
    cancel: CancellationToken,
    state: LaunchState,
    attempts: u64,
    waits: u64,
}

impl<'a, C: ComputeOperations> LaunchRetrier<'a, C> {
    pub fn new(
        compute: &'a C,
        request: &ResourceRequest,
        wait: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            compute,
            details: request.launch_details(),
            wait,
            fail_on_client_error: false,
            cancel,
            state: LaunchState::Idle,
            attempts: 0,
            waits: 0,
        }
    }

    /// Stop on 4xx client errors instead of retrying them.
    pub fn fail_on_client_error(mut self, enabled: bool) -> Self {
        self.fail_on_client_error = enabled;
        self
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    /// Run the loop to completion.
    ///
    /// Cancellation is checked while a request is in flight and while
    /// waiting; either way the session is closed and the report comes back
    /// with [`LaunchState::Aborted`].
    pub async fn run(mut self) -> Result<LaunchReport, LaunchError> {
        let mut intervals = ConstantBuilder::default()
            .with_delay(self.wait)
            .without_max_times()
            .build();

        loop {
            self.transition(LaunchState::Attempting);
            if self.cancel.is_cancelled() {
                return Ok(self.abort());
            }
            self.attempts += 1;
            let attempt = self.attempts;
            debug!(attempt, "Sending launch request");

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.compute.launch_instance(&self.details) => Some(result),
            };
            let Some(result) = result else {
                return Ok(self.abort());
            };

            let suggestion = result.as_ref().err().and_then(OciError::suggestion);
            let delay = match classify_attempt(result, self.fail_on_client_error) {
                AttemptOutcome::Success(instance) => {
                    self.transition(LaunchState::Succeeded);
                    info!(
                        attempt,
                        instance_id = %instance.id,
                        request_id = instance.request_id.as_deref().unwrap_or("-"),
                        "{SUCCESS_MESSAGE}"
                    );
                    return Ok(self.report(Some(instance)));
                }
                AttemptOutcome::FatalFailure { kind, reason } => {
                    self.transition(LaunchState::Failed);
                    return Err(LaunchError::Rejected {
                        attempt,
                        kind,
                        reason,
                        suggestion,
                    });
                }
                AttemptOutcome::RetryableFailure {
                    kind,
                    reason,
                    status,
                    code,
                } => {
                    let delay = intervals.next().unwrap_or(self.wait);
                    log_retry(attempt, kind, &reason, status, code.as_deref(), delay);
                    delay
                }
            };

            self.transition(LaunchState::RetryWaiting);
            self.waits += 1;

            let cancelled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => true,
                _ = tokio::time::sleep(delay) => false,
            };
            if cancelled {
                return Ok(self.abort());
            }
        }
    }

    fn transition(&mut self, next: LaunchState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid launch transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    fn abort(mut self) -> LaunchReport {
        self.transition(LaunchState::Aborted);
        if self.compute.close() {
            debug!("Released compute session after cancellation");
        }
        info!(
            attempts = self.attempts,
            "Cancelled by operator after {} attempt(s)", self.attempts
        );
        self.report(None)
    }

    fn report(&self, instance: Option<LaunchedInstance>) -> LaunchReport {
        LaunchReport {
            state: self.state,
            attempts: self.attempts,
            waits: self.waits,
            instance,
        }
    }
}

fn log_retry(
    attempt: u64,
    kind: ErrorKind,
    reason: &str,
    status: Option<u16>,
    code: Option<&str>,
    delay: Duration,
) {
    let secs = delay.as_secs();
    let code = code.unwrap_or("-");
    match kind {
        ErrorKind::CapacityUnavailable => info!(
            attempt,
            kind = %kind,
            status,
            code,
            "Request number: {attempt} - {reason} Retry in {secs}s"
        ),
        ErrorKind::ClientRejected => warn!(
            attempt,
            kind = %kind,
            status,
            code,
            "Request number: {attempt} - Request rejected: {reason} Retry in {secs}s"
        ),
        _ => warn!(
            attempt,
            kind = %kind,
            status,
            code,
            "Request number: {attempt} - Unexpected error: {reason} Retry in {secs}s"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::test_settings;
    use crate::log_capture::LogCapture;
    use crate::testing::{FakeCompute, capacity_error, client_error, launched};
    use tokio::time::Instant;
    use tracing::Level;
    use tracing_subscriber::prelude::*;

    const WAIT: Duration = Duration::from_secs(60);

    fn request() -> ResourceRequest {
        ResourceRequest::from_settings(&test_settings())
    }

    fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
        let capture = LogCapture::with_level(1000, Level::INFO);
        let subscriber = tracing_subscriber::registry().with(capture.layer());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    #[test]
    fn transitions() {
        use LaunchState::*;
        assert!(Idle.can_transition_to(Attempting));
        assert!(Attempting.can_transition_to(RetryWaiting));
        assert!(RetryWaiting.can_transition_to(Attempting));
        assert!(RetryWaiting.can_transition_to(Aborted));
        assert!(!RetryWaiting.can_transition_to(Succeeded));
        assert!(!Idle.can_transition_to(Succeeded));
        for terminal in [Succeeded, Aborted, Failed] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(Attempting));
        }
    }

    #[test]
    fn classify_keeps_retrying_client_errors_by_default() {
        let outcome = classify_attempt(Err(client_error()), false);
        assert_eq!(outcome.kind(), Some(ErrorKind::ClientRejected));
        assert!(matches!(
            outcome,
            AttemptOutcome::RetryableFailure { status: Some(400), .. }
        ));

        let outcome = classify_attempt(Err(client_error()), true);
        assert!(matches!(outcome, AttemptOutcome::FatalFailure { .. }));
    }

    #[test]
    fn classify_capacity_and_transport() {
        match classify_attempt(Err(capacity_error()), true) {
            AttemptOutcome::RetryableFailure {
                kind,
                reason,
                status,
                code,
            } => {
                assert_eq!(kind, ErrorKind::CapacityUnavailable);
                assert_eq!(reason, "Out of host capacity.");
                assert_eq!(status, Some(500));
                assert_eq!(code.as_deref(), Some("InternalError"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let outcome = classify_attempt(Err(OciError::Transport("reset".to_string())), true);
        assert_eq!(outcome.kind(), Some(ErrorKind::TransientRemote));
        assert!(classify_attempt(Ok(launched("worker-1")), false).is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_capacity_failures() {
        let (capture, _guard) = capture_logs();
        let failures = 3;
        let compute = FakeCompute::new()
            .then_capacity_failures(failures)
            .then(Ok(launched("worker-1")));

        let start = Instant::now();
        let report = LaunchRetrier::new(&compute, &request(), WAIT, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert!(report.succeeded());
        assert_eq!(report.attempts, failures as u64 + 1);
        assert_eq!(report.waits, failures as u64);
        let elapsed = start.elapsed();
        assert!(elapsed >= WAIT * failures as u32, "{elapsed:?}");
        assert!(elapsed < WAIT * (failures as u32 + 1), "{elapsed:?}");
        assert_eq!(compute.launch_calls(), failures + 1);
        assert_eq!(report.instance.unwrap().display_name, "worker-1");

        let entries = capture.entries();
        let retry_attempts: Vec<_> = entries
            .iter()
            .filter(|e| e.message.starts_with("Request number:"))
            .map(|e| e.fields["attempt"].clone())
            .collect();
        assert_eq!(retry_attempts, vec!["1", "2", "3"]);
        assert!(entries[0].message.ends_with("Retry in 60s"));
        assert_eq!(
            entries.iter().filter(|e| e.message == SUCCESS_MESSAGE).count(),
            1
        );
        // Capacity waits are expected and stay at INFO
        assert!(entries.iter().all(|e| e.level == Level::INFO));
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_never_waits() {
        let compute = FakeCompute::new().then(Ok(launched("worker-1")));
        let report = LaunchRetrier::new(&compute, &request(), WAIT, CancellationToken::new())
            .run()
            .await
            .unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(report.waits, 0);
        assert_eq!(compute.close_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_errors_are_retried_at_warn() {
        let (capture, _guard) = capture_logs();
        let compute = FakeCompute::new()
            .then(Err(OciError::Transport("connection reset".to_string())))
            .then(Err(client_error()))
            .then(Ok(launched("worker-1")));

        let report = LaunchRetrier::new(&compute, &request(), WAIT, CancellationToken::new())
            .run()
            .await
            .unwrap();
        assert!(report.succeeded());
        assert_eq!(report.waits, 2);

        let warnings: Vec<_> = capture
            .entries()
            .into_iter()
            .filter(|e| e.level == Level::WARN)
            .collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].message.contains("Unexpected error"));
        assert!(warnings[0].message.contains("connection reset"));
        assert!(warnings[1].message.contains("Request rejected: Invalid subnetId"));
        assert_eq!(warnings[1].fields["code"], "InvalidParameter");
    }

    #[tokio::test(start_paused = true)]
    async fn fail_on_client_error_stops_without_waiting() {
        let compute = FakeCompute::new()
            .then_capacity_failures(1)
            .then(Err(client_error()));

        let start = Instant::now();
        let err = LaunchRetrier::new(&compute, &request(), WAIT, CancellationToken::new())
            .fail_on_client_error(true)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ClientRejected);
        assert!(err.suggestion().is_some());
        assert!(err.to_string().starts_with("Launch rejected on attempt 2:"));
        let elapsed = start.elapsed();
        assert!(elapsed >= WAIT && elapsed < WAIT * 2, "{elapsed:?}");
        assert_eq!(compute.launch_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_wait_aborts_within_one_interval() {
        let compute = FakeCompute::new().repeating(capacity_error);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(90)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let report = LaunchRetrier::new(&compute, &request(), WAIT, cancel)
            .run()
            .await
            .unwrap();

        assert!(report.aborted());
        assert_eq!(report.attempts, 2);
        assert!(report.instance.is_none());
        assert!(start.elapsed() < WAIT * 2);
        assert_eq!(compute.launch_calls(), 2);
        assert_eq!(compute.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_request_in_flight() {
        let compute = FakeCompute::new().then_capacity_failures(1).then_hang();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(WAIT + Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let report = LaunchRetrier::new(&compute, &request(), WAIT, cancel)
            .run()
            .await
            .unwrap();

        assert!(report.aborted());
        // The hung request was sent, so it counts
        assert_eq!(report.attempts, 2);
        assert_eq!(compute.launch_calls(), 2);
        assert_eq!(report.waits, 1);
        assert_eq!(compute.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn double_cancel_cleans_up_once() {
        let compute = FakeCompute::new().repeating(capacity_error);
        let cancel = CancellationToken::new();
        cancel.cancel();
        cancel.cancel();

        let report = LaunchRetrier::new(&compute, &request(), WAIT, cancel.clone())
            .run()
            .await
            .unwrap();

        assert!(report.aborted());
        // Already cancelled: nothing is sent and nothing is counted
        assert_eq!(compute.launch_calls(), 0);
        assert_eq!(report.attempts, 0);
        assert_eq!(report.waits, 0);

        // A second shutdown path finds the session already released
        assert!(!compute.close());
        assert_eq!(compute.releases(), 1);
        assert_eq!(compute.close_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sends_the_same_details_every_attempt() {
        let compute = FakeCompute::new()
            .then_capacity_failures(2)
            .then(Ok(launched("worker-1")));
        let request = request();

        LaunchRetrier::new(&compute, &request, WAIT, CancellationToken::new())
            .run()
            .await
            .unwrap();

        assert_eq!(compute.last_details(), Some(request.launch_details()));
    }
}
