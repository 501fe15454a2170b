//! CLI command handling
//!
//! Maps the start/stop/restart/status subcommands onto the daemon
//! supervisor, the HTTP server and the MSB registry. Every failure mode
//! that the operator can fix (bad run directory, rejected registration,
//! missing handler) surfaces on their terminal before the process
//! detaches; after the fork only the daemon log sees errors.

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use tokio::runtime::{Builder, Runtime};
use tracing::info;

use crate::config::{Config, ServiceConfig};
use crate::daemon::{self, DaemonContext, PidFile, PidState};
use crate::http::{check_operations, HttpServer};
use crate::msb::ServiceRegistration;
use crate::pipeline::{extensions, PipelineAdapter};

/// Daemon management subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum DaemonAction {
    /// Start the service in the background
    Start,
    /// Stop the running service
    Stop,
    /// Stop the service if it is running, then start it
    Restart,
    /// Report whether the service is running
    Status,
}

/// Dispatch one daemon management command.
///
/// `name` identifies the deployable; it forms the pidfile and logfile
/// names so the plain and MSB variants can run side by side out of the
/// same run directory.
pub fn run(config: &Config, name: &str, action: DaemonAction) -> Result<()> {
    match action {
        DaemonAction::Start => start(config, name),
        DaemonAction::Stop => stop(config, name),
        DaemonAction::Restart => {
            run(config, name, DaemonAction::Stop)?;
            run(config, name, DaemonAction::Start)
        }
        DaemonAction::Status => {
            let ctx = DaemonContext::new(name, &config.daemon)?;
            daemon::status(&ctx)
        }
    }
}

fn start(config: &Config, name: &str) -> Result<()> {
    let ctx = DaemonContext::new(name, &config.daemon)?;
    std::fs::create_dir_all(&ctx.rundir)
        .with_context(|| format!("Failed to create run directory '{}'", ctx.rundir.display()))?;

    // A live instance makes start a no-op; only a stale pidfile is cleared.
    let pidfile = PidFile::new(ctx.pidfile_path.clone());
    match pidfile.probe()? {
        PidState::Live(pid) => {
            println!("Already running at pid {}", pid);
            return Ok(());
        }
        PidState::Unreadable => {
            println!("Already running");
            return Ok(());
        }
        PidState::Stale(pid) => {
            info!("Removing stale pidfile for dead pid {}", pid);
            pidfile.remove()?;
        }
        PidState::Absent => {}
    }

    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&ctx.log_path)
        .with_context(|| format!("Failed to open log file '{}'", ctx.log_path.display()))?;

    extensions::install();
    check_operations().context("HTTP operation table is incomplete")?;

    // Registration happens before the fork; tokio state must not cross it.
    if let Some(msb) = &config.msb {
        let mut registration = ServiceRegistration::new(msb, &config.service)?;
        registry_runtime()?
            .block_on(registration.register())
            .context("MSB registration failed")?;
    }

    let service = config.service.clone();
    daemon::start(&ctx, log, move || serve(service))
}

fn stop(config: &Config, name: &str) -> Result<()> {
    let ctx = DaemonContext::new(name, &config.daemon)?;
    daemon::stop(&ctx)?;

    // Removal is attempted even when nothing was running; the registry
    // treats a missing entry the same as a removed one.
    if let Some(msb) = &config.msb {
        let mut registration = ServiceRegistration::new(msb, &config.service)?;
        registry_runtime()?.block_on(registration.unregister());
    }
    Ok(())
}

/// Worker entry point, runs inside the detached daemon process.
fn serve(service: ServiceConfig) -> Result<()> {
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build worker runtime")?;

    runtime.block_on(async move {
        let adapter = Arc::new(PipelineAdapter::new()?);
        let server = HttpServer::new(service, adapter);
        daemon::run_until_signalled(server).await
    })
}

fn registry_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime for MSB registration")
}
