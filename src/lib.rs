//! Grallect: nagios-style checks for collectd metrics stored in graphite
//!
//! Every check asks graphite for the smoothed, most recent values of one
//! kind of host metric, compares each entity (a core, a disk, an interface
//! direction...) against a warning and a critical threshold, and reports the
//! worst status it saw:
//!
//! ```rust,no_run
//! use grallect::checks::Metric;
//! use grallect::config::Config;
//! use grallect::graphite::Graphite;
//! use grallect::host::HostPath;
//!
//! let config = Config::load("grallect.json").unwrap();
//! let graphite = Graphite::new(&config).unwrap();
//! let host = HostPath::new("web01.example.com", &config.collectd);
//! let report = Metric::Cpu.check(&graphite, &host, &config).unwrap();
//! report.exit();
//! ```

use std::fmt;
use std::process;

pub mod checks;
pub mod config;
pub mod graphite;
pub mod host;
pub mod report;

/// The exit status of a check, ordered from best to worst
///
/// `max` of two statuses is the more severe one, so folding a sequence of
/// statuses with `max` gives the worst seen.
#[must_use]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    /// The process exit code a nagios-compatible supervisor expects
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    pub fn exit(self) -> ! {
        process::exit(self.code())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match *self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        };
        write!(f, "{}", msg)
    }
}
