//! The single line of output that a check produces
//!
//! The format of this line and the exit code are what nagios (or sensu, or
//! anything else that runs plugins) sees, so they are kept stable:
//!
//! ```plain
//! OK: CPU 0 usage percentage was 12.5. CPU 1 usage percentage was 3.0.
//! CRITICAL: Memory usage percentage was 96.0.
//! UNKNOWN: No data was found
//! ```

use std::fmt;

use crate::Status;

/// The measured value of one checked entity
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub label: String,
    pub value: f64,
}

impl CheckResult {
    pub fn new(label: impl Into<String>, value: f64) -> CheckResult {
        CheckResult {
            label: label.into(),
            value,
        }
    }
}

/// The outcome of a check: the worst status seen, and every value checked
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub status: Status,
    pub results: Vec<CheckResult>,
}

impl Report {
    pub fn new(status: Status, results: Vec<CheckResult>) -> Report {
        Report { status, results }
    }

    /// A report for a check that graphite had nothing for
    pub fn no_data() -> Report {
        Report::new(Status::Unknown, Vec::new())
    }

    /// Print the status line and exit with the matching code
    pub fn exit(self) -> ! {
        println!("{}", self);
        self.status.exit()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.status == Status::Unknown {
            return write!(f, "{}: No data was found", self.status);
        }
        write!(f, "{}: ", self.status)?;
        for result in &self.results {
            write!(f, "{} was {}. ", result.label, format_value(result.value))?;
        }
        Ok(())
    }
}

/// Shortest decimal that round-trips, keeping a `.0` on whole numbers
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
