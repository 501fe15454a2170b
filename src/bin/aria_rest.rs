//! Plain REST deployable: serves the parser API at the root path.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use aria_rest::config::init_tracing;
use aria_rest::{commands, Config, DaemonAction};

/// Pidfile and logfile identifier for this deployable
const DAEMON_NAME: &str = "aria-rest";

#[derive(Parser)]
#[command(name = "aria-rest")]
#[command(about = "TOSCA parser REST service")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen port
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Directory for the pidfile and logfile (defaults to the home directory)
    #[arg(long)]
    rundir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    action: Option<DaemonAction>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // Command-line flags always win over the config file, defaults included.
    config.service.port = cli.port;
    if let Some(rundir) = cli.rundir {
        config.daemon.rundir = Some(rundir);
    }
    // The plain deployable never registers, even when the config file
    // carries an [msb] section.
    config.msb = None;
    config.validate()?;

    init_tracing(&config.logging, cli.verbose)?;

    commands::run(
        &config,
        DAEMON_NAME,
        cli.action.unwrap_or(DaemonAction::Status),
    )
}
