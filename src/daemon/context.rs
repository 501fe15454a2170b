//! Per-invocation daemon identity

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::UserDirs;

use crate::config::DaemonConfig;

/// Process-wide identity of one daemon instance.
///
/// Constructed fresh per CLI invocation; the pidfile it points at is the only
/// state that outlives it.
#[derive(Debug, Clone)]
pub struct DaemonContext {
    /// Short identifier, forms the pidfile and logfile names
    pub name: String,
    /// Directory holding the pidfile and logfile
    pub rundir: PathBuf,
    /// `rundir/name.pid`
    pub pidfile_path: PathBuf,
    /// `rundir/name.log`
    pub log_path: PathBuf,
    /// How long to wait for the pidfile lock during startup
    pub acquire_timeout: Duration,
    /// Interval between pidfile polls while waiting for the worker to stop
    pub stop_poll: Duration,
}

impl DaemonContext {
    /// Build the context for a named daemon, resolving the run directory
    /// from configuration or falling back to the user's home directory.
    pub fn new(name: &str, config: &DaemonConfig) -> Result<Self> {
        let rundir = match &config.rundir {
            Some(dir) => dir.clone(),
            None => UserDirs::new()
                .map(|dirs| dirs.home_dir().to_path_buf())
                .context("Could not determine a home directory for the default run directory")?,
        };

        Ok(Self {
            pidfile_path: rundir.join(format!("{name}.pid")),
            log_path: rundir.join(format!("{name}.log")),
            name: name.to_string(),
            rundir,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
            stop_poll: Duration::from_millis(config.stop_poll_ms),
        })
    }
}
