//! Open-O deployable: serves under the MSB API tree and registers with
//! the Microservice Bus on start.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use aria_rest::config::{init_tracing, MsbConfig};
use aria_rest::{commands, Config, DaemonAction};

/// Pidfile and logfile identifier for this deployable
const DAEMON_NAME: &str = "aria-rest-msb";

/// Base path the MSB routes requests under
const OPENO_BASE_PATH: &str = "/openoapi/tosca/v1/";

#[derive(Parser)]
#[command(name = "aria-rest-msb")]
#[command(about = "TOSCA parser REST service, registered with the Open-O MSB")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IP address to bind and to announce to the MSB
    #[arg(long)]
    ip: String,

    /// HTTP listen port
    #[arg(long, default_value_t = 8204)]
    port: u16,

    /// MSB host to register with
    #[arg(long = "msb_ip")]
    msb_ip: String,

    /// MSB port
    #[arg(long = "msb_port", default_value_t = 80)]
    msb_port: u16,

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
    config.service.base_path = OPENO_BASE_PATH.to_string();
    config.service.bind_ip = cli.ip.clone();
    config.service.port = cli.port;
    if let Some(rundir) = cli.rundir {
        config.daemon.rundir = Some(rundir);
    }

    // The registry endpoint path may come from the config file; host and
    // port always come from the command line.
    let register_path = config
        .msb
        .take()
        .map(|msb| msb.register_path)
        .unwrap_or_else(|| MsbConfig::default().register_path);
    config.msb = Some(MsbConfig {
        host: cli.msb_ip.clone(),
        port: cli.msb_port,
        register_path,
    });
    config.validate()?;

    init_tracing(&config.logging, cli.verbose)?;

    commands::run(
        &config,
        DAEMON_NAME,
        cli.action.unwrap_or(DaemonAction::Status),
    )
}
