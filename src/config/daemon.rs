//! Daemon supervision configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Daemon supervision configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the pidfile and logfile (defaults to the user's home)
    #[serde(default)]
    pub rundir: Option<PathBuf>,
    /// Seconds to wait for the pidfile lock during startup
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Milliseconds between pidfile polls while waiting for the worker to stop
    #[serde(default = "default_stop_poll_ms")]
    pub stop_poll_ms: u64,
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_stop_poll_ms() -> u64 {
    100
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rundir: None,
            acquire_timeout_secs: default_acquire_timeout_secs(),
            stop_poll_ms: default_stop_poll_ms(),
        }
    }
}
