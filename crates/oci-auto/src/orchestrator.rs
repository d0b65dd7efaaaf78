//! Top-level flows: audit gate, then the launch loop
//!
//! Both flows are generic over [`ComputeOperations`] and take the settings
//! by reference; `main` owns the client and the cancellation token.

use crate::config::Settings;
use crate::launch::{LaunchReport, LaunchRetrier, ResourceRequest};
use crate::oci::{ComputeOperations, LaunchInstanceDetails};
use crate::quota::{AuditReport, QuotaAuditor};
use anyhow::{Context, Result};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Output format of the `audit` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// How a `launch` run ended without a fatal error
#[derive(Debug)]
pub enum LaunchOutcome {
    /// Audit passed; the launch body was printed instead of sent
    DryRun(LaunchInstanceDetails),
    /// Cancelled before the audit finished
    Cancelled,
    /// The launch loop reached a terminal state
    Finished(LaunchReport),
}

/// Log what is about to be requested.
pub fn log_banner(request: &ResourceRequest) {
    info!(
        shape = request.shape(),
        ocpus = request.ocpus(),
        memory_gb = request.memory_gb(),
        display_name = request.display_name(),
        "Script to launch {} instance: {} ocpus - {} GB",
        request.shape(),
        request.ocpus(),
        request.memory_gb()
    );
}

/// Audit, then retry the launch until it lands or the operator stops it.
///
/// A failing audit comes back as a [`crate::error::PrecheckError`] before
/// any launch request is sent. The compute session is closed on every exit
/// path.
pub async fn run_launch<C: ComputeOperations>(
    compute: &C,
    settings: &Settings,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<LaunchOutcome> {
    let request = ResourceRequest::from_settings(settings);
    log_banner(&request);

    let result = launch_flow(compute, settings, &request, dry_run, cancel).await;
    compute.close();
    result
}

async fn launch_flow<C: ComputeOperations>(
    compute: &C,
    settings: &Settings,
    request: &ResourceRequest,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<LaunchOutcome> {
    let auditor = QuotaAuditor::new(compute);
    let audit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        report = auditor.audit(request) => Some(report),
    };
    let Some(audit) = audit else {
        info!("Cancelled by operator during quota audit");
        return Ok(LaunchOutcome::Cancelled);
    };
    audit
        .context("Failed to list instances for quota audit")?
        .into_result()?;

    if dry_run {
        let details = request.launch_details();
        println!("{}", serde_json::to_string_pretty(&details)?);
        info!("Dry run: launch request not sent");
        return Ok(LaunchOutcome::DryRun(details));
    }

    let report = LaunchRetrier::new(compute, request, settings.wait(), cancel)
        .fail_on_client_error(settings.retry.fail_on_client_error)
        .run()
        .await?;

    Ok(LaunchOutcome::Finished(report))
}

/// Run the audit alone and print the result.
///
/// A failing decision is returned as an error after the report is printed.
pub async fn run_audit<C: ComputeOperations>(
    compute: &C,
    settings: &Settings,
    format: OutputFormat,
) -> Result<AuditReport> {
    let request = ResourceRequest::from_settings(settings);
    log_banner(&request);

    let result = QuotaAuditor::new(compute).audit(&request).await;
    compute.close();
    let report = result.context("Failed to list instances for quota audit")?;

    match format {
        OutputFormat::Table => println!("{}", audit_table(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(report.into_result()?)
}

/// Instance table with usage totals and the decision
pub fn audit_table(report: &AuditReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name"),
            Cell::new("Shape"),
            Cell::new("OCPUs"),
            Cell::new("Memory (GB)"),
            Cell::new("State"),
        ]);

    for instance in &report.instances {
        table.add_row(vec![
            Cell::new(&instance.display_name),
            Cell::new(&instance.shape),
            Cell::new(instance.ocpus()),
            Cell::new(instance.memory_gb()),
            Cell::new(instance.lifecycle_state),
        ]);
    }

    let snapshot = &report.snapshot;
    table.add_row(vec![
        Cell::new("Total (active)"),
        Cell::new(format!("{} instance(s)", snapshot.instance_count)),
        Cell::new(snapshot.total_cpu),
        Cell::new(snapshot.total_memory_gb),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Free"),
        Cell::new(""),
        Cell::new(snapshot.free_cpu(&report.ceiling)),
        Cell::new(snapshot.free_memory_gb(&report.ceiling)),
        Cell::new(match &report.decision {
            Ok(()) => "PASS".to_string(),
            Err(e) => format!("FAIL: {}", e.kind()),
        }),
    ]);

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::test_settings;
    use crate::error::PrecheckError;
    use crate::launch::LaunchState;
    use crate::testing::{FakeCompute, capacity_error, launched, summary};
    use oci_auto_common::defaults::SHAPE;

    fn full_account() -> Vec<crate::oci::InstanceSummary> {
        vec![summary("big", SHAPE, 4, 24, "RUNNING")]
    }

    #[tokio::test(start_paused = true)]
    async fn launch_after_passing_audit() {
        let compute = FakeCompute::new()
            .with_instances(vec![summary("other", SHAPE, 1, 6, "RUNNING")])
            .then_capacity_failures(2)
            .then(Ok(launched("worker-1")));

        let outcome = run_launch(&compute, &test_settings(), false, CancellationToken::new())
            .await
            .unwrap();

        let LaunchOutcome::Finished(report) = outcome else {
            panic!("expected a finished launch");
        };
        assert_eq!(report.state, LaunchState::Succeeded);
        assert_eq!(report.attempts, 3);
        assert_eq!(compute.list_calls(), 1);
        assert_eq!(compute.releases(), 1);
    }

    #[tokio::test]
    async fn failing_audit_blocks_every_launch() {
        let compute = FakeCompute::new()
            .with_instances(full_account())
            .then(Ok(launched("worker-1")));

        let err = run_launch(&compute, &test_settings(), false, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PrecheckError>(),
            Some(PrecheckError::QuotaExceeded { .. })
        ));
        assert_eq!(compute.launch_calls(), 0);
        assert_eq!(compute.releases(), 1);
    }

    #[tokio::test]
    async fn duplicate_name_blocks_launch() {
        let compute = FakeCompute::new()
            .with_instances(vec![summary("worker-1", SHAPE, 1, 6, "STOPPED")]);

        let err = run_launch(&compute, &test_settings(), false, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<PrecheckError>(),
            Some(&PrecheckError::DuplicateName("worker-1".to_string()))
        );
        assert_eq!(compute.launch_calls(), 0);
    }

    #[tokio::test]
    async fn audit_api_failure_is_fatal() {
        let compute = FakeCompute::new().with_list_error(capacity_error);
        let err = run_launch(&compute, &test_settings(), false, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota audit"));
        assert!(err.downcast_ref::<PrecheckError>().is_none());
        assert_eq!(compute.launch_calls(), 0);
    }

    #[tokio::test]
    async fn dry_run_sends_nothing() {
        let compute = FakeCompute::new();
        let outcome = run_launch(&compute, &test_settings(), true, CancellationToken::new())
            .await
            .unwrap();

        let LaunchOutcome::DryRun(details) = outcome else {
            panic!("expected a dry run");
        };
        assert_eq!(details.display_name, "worker-1");
        assert_eq!(compute.launch_calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_audit() {
        let compute = FakeCompute::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = run_launch(&compute, &test_settings(), false, cancel)
            .await
            .unwrap();
        assert!(matches!(outcome, LaunchOutcome::Cancelled));
        assert_eq!(compute.list_calls(), 0);
        assert_eq!(compute.releases(), 1);
    }

    #[tokio::test]
    async fn audit_command_reports_failure() {
        let compute = FakeCompute::new().with_instances(full_account());
        let err = run_audit(&compute, &test_settings(), OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<PrecheckError>().is_some());
    }

    #[tokio::test]
    async fn audit_table_lists_instances_and_decision() {
        let compute = FakeCompute::new().with_instances(vec![
            summary("alpha", SHAPE, 2, 12, "RUNNING"),
            summary("beta", SHAPE, 1, 6, "TERMINATED"),
        ]);
        let report = run_audit(&compute, &test_settings(), OutputFormat::Table)
            .await
            .unwrap();

        let rendered = audit_table(&report).to_string();
        assert!(rendered.contains("alpha"));
        assert!(rendered.contains("TERMINATED"));
        assert!(rendered.contains("1 instance(s)"));
        assert!(rendered.contains("PASS"));
    }
}
