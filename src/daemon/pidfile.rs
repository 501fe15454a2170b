//! Pidfile probing, acquisition, and release
//!
//! The pidfile is the single cross-process synchronization object between the
//! CLI invoker and the detached worker. At most one live holder may exist per
//! path; acquisition is atomic and stale locks left behind by dead holders
//! are broken and retried.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{info, warn};

/// Interval between acquisition retries while another holder is alive
const ACQUIRE_POLL: Duration = Duration::from_millis(100);

/// Observed state of a pidfile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidState {
    /// No file at the path
    Absent,
    /// File names a pid whose process is alive
    Live(u32),
    /// File names a pid whose process is gone
    Stale(u32),
    /// File exists but its contents are not a pid; the holder cannot be
    /// identified, so the lock is never broken from this state
    Unreadable,
}

/// Handle on a pidfile path
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Classify the current state of the pidfile.
    pub fn probe(&self) -> Result<PidState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PidState::Absent),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read pidfile '{}'", self.path.display())
                })
            }
        };

        match parse_pid(&content) {
            Some(pid) if process_exists(pid) => Ok(PidState::Live(pid)),
            Some(pid) => Ok(PidState::Stale(pid)),
            None => Ok(PidState::Unreadable),
        }
    }

    /// Read the recorded pid, if the file exists and parses.
    pub fn read_pid(&self) -> Result<Option<u32>> {
        match self.probe()? {
            PidState::Live(pid) | PidState::Stale(pid) => Ok(Some(pid)),
            PidState::Absent | PidState::Unreadable => Ok(None),
        }
    }

    /// Remove the pidfile, tolerating it already being gone.
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove pidfile '{}'", self.path.display())
            }),
        }
    }

    /// Acquire the pidfile for the current process.
    ///
    /// Uses `create_new(true)` for atomic creation to avoid TOCTOU races
    /// where two processes could interleave exists/read/remove/create. Stale
    /// locks are broken and the acquisition retried; a live holder makes the
    /// call wait up to `timeout` before failing.
    pub fn acquire(&self, timeout: Duration) -> Result<PidGuard> {
        let deadline = Instant::now() + timeout;

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
            {
                Ok(mut file) => {
                    writeln!(file, "{}", std::process::id()).with_context(|| {
                        format!("Failed to write pidfile '{}'", self.path.display())
                    })?;
                    info!("Acquired pidfile '{}'", self.path.display());
                    return Ok(PidGuard {
                        path: self.path.clone(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to create pidfile '{}'", self.path.display())
                    })
                }
            }

            match self.probe()? {
                PidState::Stale(pid) => {
                    warn!("Breaking stale pidfile '{}' (pid {})", self.path.display(), pid);
                    self.remove()?;
                }
                PidState::Absent => {}
                PidState::Live(_) | PidState::Unreadable => {
                    if Instant::now() >= deadline {
                        anyhow::bail!(
                            "Timed out waiting for pidfile lock '{}'",
                            self.path.display()
                        );
                    }
                    std::thread::sleep(ACQUIRE_POLL);
                }
            }
        }
    }
}

/// RAII holder of an acquired pidfile; releases the lock on drop.
#[derive(Debug)]
pub struct PidGuard {
    path: PathBuf,
}

impl Drop for PidGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!("Failed to remove pidfile '{}': {}", self.path.display(), e);
            }
            _ => {}
        }
    }
}

/// Parse pidfile content into a pid.
///
/// Kernel pids fit `i32`; a larger value cannot name a process and is
/// treated the same as unparseable content. Cast into the signal API it
/// would alias a negative pid, and negative pids address whole process
/// groups.
fn parse_pid(content: &str) -> Option<u32> {
    let pid = content.trim().parse::<u32>().ok()?;
    i32::try_from(pid).ok()?;
    Some(pid)
}

/// Check if a process with the given pid exists.
///
/// Signal 0 probes without delivering anything; EPERM means the process
/// exists but belongs to someone else. Pid 0 (the caller's process
/// group) and values past `i32::MAX` never name a single process.
pub fn process_exists(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    if pid == 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
