//! Daemon Module
//!
//! Pidfile-supervised background process hosting the parse service. The
//! invoking CLI and the detached worker coordinate through a single
//! pidfile lock; the worker holds it for its lifetime and releases it on
//! the way out.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  fork + detach   ┌─────────────────────────────┐
//! │ CLI invoker │ ───────────────▶ │ detached worker             │
//! │ start/stop/ │                  │  holds <rundir>/<name>.pid  │
//! │ status      │ ◀── pidfile ──── │  serves HTTP until SIGTERM  │
//! └─────────────┘                  │  stdio → <rundir>/<name>.log│
//!                                  └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! Start the daemon:
//! ```bash
//! aria-rest start
//! ```
//!
//! Check status:
//! ```bash
//! aria-rest status
//! ```
//!
//! Stop the daemon:
//! ```bash
//! aria-rest stop
//! ```

pub mod context;
pub mod pidfile;
pub mod supervisor;

pub use context::DaemonContext;
pub use pidfile::{process_exists, PidFile, PidGuard, PidState};
pub use supervisor::{run_until_signalled, start, status, stop};
