//! Daemon lifecycle management
//!
//! Handles detaching the worker process, signalling it to stop, and
//! reporting its status. All operator-facing output goes to stdout;
//! diagnostics go to the log via `tracing`.

use std::ffi::OsStr;
use std::fs::File;
use std::time::Duration;

use anyhow::{Context, Result};
use daemonize_me::Daemon;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::http::HttpServer;

use super::context::DaemonContext;
use super::pidfile::{PidFile, PidState};

/// How long the worker waits for the HTTP server to wind down after a
/// shutdown signal before aborting it
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Detach into the background and run `worker` in the detached process.
///
/// The parent process exits inside the daemonization call; only the
/// detached child returns from it. The child acquires the pidfile,
/// runs the worker to completion, and releases the lock on the way out.
/// Both stdio streams are redirected to the daemon log file.
pub fn start<F>(ctx: &DaemonContext, log: File, worker: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let stderr = log
        .try_clone()
        .context("Failed to duplicate log file handle")?;

    Daemon::new()
        .work_dir(&ctx.rundir)
        .name(OsStr::new(ctx.name.as_str()))
        .stdout(log)
        .stderr(stderr)
        .start()
        .map_err(|e| anyhow::anyhow!("Failed to daemonize: {e}"))?;

    // Only the detached child reaches this point.
    let pidfile = PidFile::new(ctx.pidfile_path.clone());
    let _guard = pidfile.acquire(ctx.acquire_timeout)?;
    info!("Daemon '{}' started (pid {})", ctx.name, std::process::id());

    let result = worker();
    match &result {
        Ok(()) => info!("Daemon '{}' exiting", ctx.name),
        Err(e) => error!("Daemon '{}' failed: {:#}", ctx.name, e),
    }
    result
}

/// Signal the running worker to stop and wait for it to release the lock.
///
/// Polls the pidfile until the worker removes it. There is no timeout;
/// an unresponsive worker blocks this call indefinitely.
pub fn stop(ctx: &DaemonContext) -> Result<()> {
    let pidfile = PidFile::new(ctx.pidfile_path.clone());

    match pidfile.probe()? {
        PidState::Absent | PidState::Unreadable => {
            println!("Not running");
            return Ok(());
        }
        PidState::Stale(pid) => {
            info!("Removing stale pidfile left by pid {}", pid);
            pidfile.remove()?;
        }
        PidState::Live(pid) => {
            signal_terminate(pid)?;
            loop {
                match pidfile.probe()? {
                    PidState::Absent => break,
                    PidState::Stale(_) | PidState::Unreadable => {
                        pidfile.remove()?;
                        break;
                    }
                    PidState::Live(_) => {
                        println!("Waiting for pid {} to exit", pid);
                        std::thread::sleep(ctx.stop_poll);
                    }
                }
            }
        }
    }

    println!("Stopped");
    Ok(())
}

/// Report whether the worker is running.
pub fn status(ctx: &DaemonContext) -> Result<()> {
    let pidfile = PidFile::new(ctx.pidfile_path.clone());
    match pidfile.probe()? {
        PidState::Live(pid) => println!("Running at pid {}", pid),
        _ => println!("Not running"),
    }
    Ok(())
}

/// Serve HTTP until Ctrl+C or SIGTERM arrives, then shut down.
///
/// The server task gets a grace window to wind down before being aborted.
/// If the server fails on its own (bind error, fatal I/O), its error is
/// propagated instead of waiting for a signal.
pub async fn run_until_signalled(server: HttpServer) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(16);
    let mut server_handle = tokio::spawn(server.run(shutdown_rx));

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = wait_for_sigterm() => {
            info!("Received SIGTERM, shutting down");
        }
        result = &mut server_handle => {
            return result.context("HTTP server task panicked")?;
        }
    }

    let _ = shutdown_tx.send(());

    let abort = server_handle.abort_handle();
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut server_handle).await {
        Ok(result) => result.context("HTTP server task panicked")?,
        Err(_) => {
            warn!(
                "HTTP server did not shut down within {}s, aborting",
                SHUTDOWN_GRACE.as_secs()
            );
            abort.abort();
            Ok(())
        }
    }
}

fn signal_terminate(pid: u32) -> Result<()> {
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        // Already gone; fall through to lock cleanup
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(Errno::EPERM) => anyhow::bail!("Not permitted to signal pid {}", pid),
        Err(e) => Err(anyhow::anyhow!("Failed to signal pid {}: {}", pid, e)),
    }
}

/// Wait for SIGTERM signal
#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}. Falling back to pending future.", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    // On non-Unix, just wait forever (Ctrl+C will still work)
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaemonConfig;
    use tempfile::TempDir;

    fn test_context(temp_dir: &TempDir) -> DaemonContext {
        let config = DaemonConfig {
            rundir: Some(temp_dir.path().to_path_buf()),
            acquire_timeout_secs: 1,
            stop_poll_ms: 10,
        };
        DaemonContext::new("test-daemon", &config).unwrap()
    }

    #[test]
    fn stop_without_pidfile_is_a_clean_noop() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        stop(&ctx).unwrap();
        assert!(!ctx.pidfile_path.exists());
    }

    #[test]
    fn stop_clears_stale_pidfile() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        std::fs::write(&ctx.pidfile_path, "2147483646\n").unwrap();

        stop(&ctx).unwrap();
        assert!(
            !ctx.pidfile_path.exists(),
            "stale pidfile should be removed by stop"
        );
    }

    #[test]
    fn stop_leaves_unreadable_pidfile_alone() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        std::fs::write(&ctx.pidfile_path, "garbage\n").unwrap();

        stop(&ctx).unwrap();
        assert!(
            ctx.pidfile_path.exists(),
            "a lock that cannot be attributed must not be broken"
        );
    }

    #[test]
    fn stop_never_signals_an_out_of_range_pid() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        std::fs::write(&ctx.pidfile_path, format!("{}\n", u32::MAX)).unwrap();

        // A SIGTERM here would go to pid -1; the entry must classify as
        // unreadable and take the "Not running" path instead.
        stop(&ctx).unwrap();
        assert!(ctx.pidfile_path.exists());
    }

    #[test]
    fn status_reports_without_error_in_every_state() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);

        status(&ctx).unwrap();

        std::fs::write(&ctx.pidfile_path, format!("{}\n", std::process::id())).unwrap();
        status(&ctx).unwrap();

        std::fs::write(&ctx.pidfile_path, "2147483646\n").unwrap();
        status(&ctx).unwrap();

        std::fs::write(&ctx.pidfile_path, format!("{}\n", u32::MAX)).unwrap();
        status(&ctx).unwrap();
    }
}
