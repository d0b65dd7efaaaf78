//! oci-auto: retry an OCI A1 instance launch until capacity frees up

use anyhow::{Context, Result};
use clap::Parser;
use oci_auto::cli::{Args, Command};
use oci_auto::launch::LaunchState;
use oci_auto::logging::{self, LoggingGuard};
use oci_auto::oci::{ComputeClient, OciContext};
use oci_auto::orchestrator::{self, LaunchOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // A missing .env is fine; everything can come from flags or the environment
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let (settings, command) = args.into_parts();

    let logging = match logging::init(&settings.log_file) {
        Ok(guard) => guard,
        Err(e) => {
            print_error(&e);
            std::process::exit(oci_auto::EXIT_FAILURE);
        }
    };

    let code = match run(settings, command).await {
        Ok(()) => 0,
        Err(e) => {
            let kind = oci_auto::error_kind(&e)
                .map(|k| k.to_string())
                .unwrap_or_else(|| "unclassified".to_string());
            error!(severity = "critical", kind = %kind, "{e:#}");
            print_error(&e);
            oci_auto::exit_code(&e)
        }
    };

    finish(logging);
    std::process::exit(code);
}

/// Print the unexpected errors seen during the run, then flush the log file.
fn finish(logging: LoggingGuard) {
    logging.capture().print_to_stderr();
    drop(logging);
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = oci_auto::suggestion(e) {
        let _ = writeln!(stderr, "  \x1b[36mHint:\x1b[0m {hint}");
    }
}

/// Cancel the token on the first Ctrl-C.
fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}

async fn run(settings: oci_auto::config::Settings, command: Command) -> Result<()> {
    let settings = settings.validated()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        profile = %settings.oci.profile,
        config_file = %settings.oci.config_file.display(),
        "Starting oci-auto"
    );

    let oci = OciContext::load(&settings.oci)?;
    info!(region = oci.region(), endpoint = %oci.endpoint(), "Loaded OCI profile");
    let compute =
        ComputeClient::from_context(&oci).context("Failed to create compute client")?;

    match command {
        Command::Launch { dry_run, .. } => {
            let cancel = CancellationToken::new();
            spawn_interrupt_listener(cancel.clone());

            match orchestrator::run_launch(&compute, &settings, dry_run, cancel).await? {
                LaunchOutcome::DryRun(_) => {}
                LaunchOutcome::Cancelled => info!("Stopped before any launch attempt"),
                LaunchOutcome::Finished(report) => match report.state {
                    LaunchState::Succeeded => {
                        if let Some(instance) = &report.instance {
                            info!(
                                instance_id = %instance.id,
                                state = %instance.lifecycle_state,
                                attempts = report.attempts,
                                "Launched {} after {} attempt(s)",
                                instance.display_name,
                                report.attempts
                            );
                        }
                    }
                    state => {
                        info!(state = %state, attempts = report.attempts, "Launch loop stopped")
                    }
                },
            }
        }
        Command::Audit { format, .. } => {
            orchestrator::run_audit(&compute, &settings, format).await?;
        }
    }

    Ok(())
}
