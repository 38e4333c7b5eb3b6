mod args;

use std::env;
use std::path::PathBuf;

use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use grallect::config::Config;
use grallect::graphite::Graphite;
use grallect::host::HostPath;
use grallect::Status;

use crate::args::Args;

const CONFIG_FILE: &str = "grallect.json";

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    debug!(path = %config_path.display(), "loading configuration");
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "unable to load configuration");
            internal_error();
        }
    };

    let host = HostPath::new(&args.host, &config.collectd);
    debug!(%host, "resolved host path");

    let graphite = match Graphite::new(&config) {
        Ok(graphite) => graphite,
        Err(e) => {
            error!(error = %e, "unable to build graphite client");
            internal_error();
        }
    };

    match args.metric.check(&graphite, &host, &config) {
        Ok(report) => report.exit(),
        Err(e) => {
            error!(error = %e, metric = %args.metric, "check failed");
            internal_error();
        }
    }
}

/// The status line for failures that aren't about the host being checked
fn internal_error() -> ! {
    println!("{}: Internal error", Status::Unknown);
    Status::Unknown.exit()
}

/// Diagnostics go to stderr; stdout is reserved for the status line
fn init_tracing(verbose: bool) {
    let default = if verbose { "grallect=debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `grallect.json` in the directory holding the executable
fn default_config_path() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}
