use std::ffi::OsString;
use std::path::PathBuf;

use structopt::clap::{self, ErrorKind};
use structopt::StructOpt;

use grallect::checks::Metric;
use grallect::Status;

/// Check a host's collectd metrics in graphite
///
/// Exits 0 (ok), 1 (warning), 2 (critical) or 3 (unknown, or an internal
/// error) so that it can be used as a nagios or sensu plugin.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "grallect",
    author = "Brandon W Maister <quodlibetor@gmail.com>",
    after_help = "Metrics:

    cpu          user + system time of every core
    memory       used memory, percent of total
    swap         used swap, percent of total
    load         short term load average
    disk         read + write operations of every sd* device, percent of disk.iops
    df           used space of every filesystem, percent of its size
    interface    rx and tx of every interface, percent of interface.mbps

    Warning and critical thresholds for each metric live in the config file.
    A value equal to a threshold counts as reaching it."
)]
pub(crate) struct Args {
    #[structopt(
        short = "c",
        long = "config",
        parse(from_os_str),
        help = "Path to configuration file. Default: grallect.json next to this program"
    )]
    pub config: Option<PathBuf>,
    #[structopt(short = "v", long = "verbose", help = "Run verbosely")]
    pub verbose: bool,
    #[structopt(help = "The host to check, e.g. web01.example.com")]
    pub host: String,
    #[structopt(help = "The metric to check. See below.")]
    pub metric: Metric,
}

impl Args {
    /// Parse the process arguments, exiting unknown on any usage error
    pub fn parse() -> Args {
        match Args::parse_from(std::env::args_os()) {
            Ok(args) => args,
            Err(e) => match e.kind {
                ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => e.exit(),
                _ => {
                    eprintln!("{}", e.message);
                    Status::Unknown.exit();
                }
            },
        }
    }

    fn parse_from<I>(argv: I) -> Result<Args, clap::Error>
    where
        I: IntoIterator,
        I::Item: Into<OsString> + Clone,
    {
        Args::from_iter_safe(argv)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn host_and_metric() {
        let args = Args::parse_from(vec!["grallect", "web01.example.com", "cpu"]).unwrap();
        assert_eq!(args.host, "web01.example.com");
        assert_eq!(args.metric, Metric::Cpu);
        assert_eq!(args.config, None);
        assert_eq!(args.verbose, false);
    }

    #[test]
    fn flags() {
        let args = Args::parse_from(vec![
            "grallect", "-v", "--config", "/etc/grallect.json", "db1", "df",
        ]).unwrap();
        assert_eq!(args.verbose, true);
        assert_eq!(args.config, Some(PathBuf::from("/etc/grallect.json")));
        assert_eq!(args.metric, Metric::Df);

        let args = Args::parse_from(vec!["grallect", "-c", "other.json", "db1", "load"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("other.json")));
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let err = Args::parse_from(vec!["grallect", "db1", "uptime"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueValidation);
        assert!(err.message.contains("uptime"), "{}", err.message);
    }

    #[test]
    fn positional_args_are_required_and_bounded() {
        let err = Args::parse_from(vec!["grallect", "db1"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingRequiredArgument);

        let err = Args::parse_from(vec!["grallect", "db1", "cpu", "extra"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_and_version_are_not_usage_errors() {
        let err = Args::parse_from(vec!["grallect", "--help"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::HelpDisplayed);

        let err = Args::parse_from(vec!["grallect", "--version"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::VersionDisplayed);
    }
}
