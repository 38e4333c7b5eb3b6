//! The checks that grallect knows how to run
//!
//! Every check follows the same shape: fetch one or more series from
//! graphite, work out one value per entity (a core, a disk, a filesystem, an
//! interface direction), classify each value against the thresholds for its
//! metric, and fold those into the worst status seen.
//!
//! Thresholds are inclusive at both ends: a value equal to `warning` is a
//! warning, a value equal to `critical` is critical.

use std::cmp::max;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, Thresholds};
use crate::graphite::{GraphiteData, GraphiteError, Source};
use crate::host::HostPath;
use crate::report::{CheckResult, Report};
use crate::Status;

/// Bytes per second in one megabit per second
const BYTES_PER_MEGABIT: f64 = 131_072.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
    Df,
    Interface,
    Swap,
    Load,
}

type CheckFn = fn(&dyn Source, &HostPath, &Config) -> Result<Report, CheckError>;

impl Metric {
    pub fn all() -> &'static [Metric] {
        &[
            Metric::Cpu,
            Metric::Memory,
            Metric::Disk,
            Metric::Df,
            Metric::Interface,
            Metric::Swap,
            Metric::Load,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Disk => "disk",
            Metric::Df => "df",
            Metric::Interface => "interface",
            Metric::Swap => "swap",
            Metric::Load => "load",
        }
    }

    /// Run the check for this metric against `host`
    pub fn check(
        self,
        source: &dyn Source,
        host: &HostPath,
        config: &Config,
    ) -> Result<Report, CheckError> {
        let routine: CheckFn = match self {
            Metric::Cpu => check_cpu,
            Metric::Memory => check_memory,
            Metric::Disk => check_disk,
            Metric::Df => check_df,
            Metric::Interface => check_interface,
            Metric::Swap => check_swap,
            Metric::Load => check_load,
        };
        debug!(metric = self.name(), host = %host, "running check");
        routine(source, host, config)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("I do not know how to check {0}")]
pub struct UnknownMetric(String);

impl FromStr for Metric {
    type Err = UnknownMetric;
    fn from_str(s: &str) -> Result<Metric, UnknownMetric> {
        Metric::all()
            .iter()
            .cloned()
            .find(|metric| metric.name() == s)
            .ok_or_else(|| UnknownMetric(s.to_owned()))
    }
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Graphite(#[from] GraphiteError),
    #[error("invalid identifier pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Classify a single value against a pair of thresholds
pub fn classify(value: f64, thresholds: Thresholds) -> Status {
    if value >= thresholds.critical {
        Status::Critical
    } else if value >= thresholds.warning {
        Status::Warning
    } else {
        Status::Ok
    }
}

/// Fold one more value into the status accumulated so far
///
/// The status never improves: once critical, later values can't bring it
/// back down. A missing value means we can't say anything, so it is unknown.
pub fn update_code(code: Option<Status>, value: Option<f64>, thresholds: Thresholds) -> Status {
    match value {
        Some(value) => max(code.unwrap_or(Status::Ok), classify(value, thresholds)),
        None => Status::Unknown,
    }
}

/// Classify every entity and build the report for them
///
/// Entities without a value make the report unknown.
pub fn classify_entities(entities: Vec<(String, Option<f64>)>, thresholds: Thresholds) -> Report {
    if entities.is_empty() {
        return Report::no_data();
    }
    let mut code = None;
    let mut results = Vec::with_capacity(entities.len());
    for (label, value) in entities {
        let updated = update_code(code, value, thresholds);
        debug!(entity = %label, ?value, status = %updated, "classified");
        code = Some(updated);
        match value {
            Some(value) => results.push(CheckResult::new(label, value)),
            None => warn!(entity = %label, "no recent value"),
        }
    }
    Report::new(code.unwrap_or(Status::Unknown), results)
}

/// The first capture group of `pattern` in `target`
fn capture(pattern: &Regex, target: &str) -> Option<String> {
    pattern
        .captures(target)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Key the latest value of every series by the identifier in its target
///
/// Series whose target doesn't contain an identifier are skipped.
pub fn by_identifier(data: &[GraphiteData], pattern: &Regex) -> Vec<(String, Option<f64>)> {
    data.iter()
        .filter_map(|series| match capture(pattern, &series.target) {
            Some(id) => Some((id, series.last_value())),
            None => {
                warn!(series = %series.target, %pattern, "no identifier in target, skipping");
                None
            }
        })
        .collect()
}

/// Join two fetches on their identifiers and combine the matching values
///
/// The order and the set of entities come from `first`. An entity missing
/// from `second`, or missing a value in either, has no value.
pub fn paired<F>(
    first: &[GraphiteData],
    second: &[GraphiteData],
    pattern: &Regex,
    combine: F,
) -> Vec<(String, Option<f64>)>
where
    F: Fn(f64, f64) -> Option<f64>,
{
    let others: HashMap<String, Option<f64>> = by_identifier(second, pattern).into_iter().collect();
    by_identifier(first, pattern)
        .into_iter()
        .map(|(id, value)| {
            let other = others.get(&id).cloned().and_then(|v| v);
            let combined = match (value, other) {
                (Some(a), Some(b)) => combine(a, b),
                _ => None,
            };
            (id, combined)
        })
        .collect()
}

/// Matches the id of a `<kind>-<id>` node directly below the host path
///
/// Anchored on the host path so that a host named like a node (`cpu-box`)
/// isn't mistaken for one.
fn identifier(host: &HostPath, kind: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"{}\.{}-([^.]+)\.",
        regex::escape(host.as_str()),
        regex::escape(kind)
    ))
}

fn labelled<F>(entities: Vec<(String, Option<f64>)>, label: F) -> Vec<(String, Option<f64>)>
where
    F: Fn(&str) -> String,
{
    entities
        .into_iter()
        .map(|(id, value)| (label(&id), value))
        .collect()
}

/// Checks of a single host-wide value: memory, swap and load
fn check_single(
    source: &dyn Source,
    expression: &str,
    label: &str,
    thresholds: Thresholds,
) -> Result<Report, CheckError> {
    let data = source.fetch(expression)?;
    let series = match data.first() {
        Some(series) => series,
        None => return Ok(Report::no_data()),
    };
    if data.len() > 1 {
        debug!(
            ignored = data.len() - 1,
            using = %series.target,
            "graphite returned more than one series"
        );
    }
    if let Some(point) = series.points.last() {
        debug!(%point, "most recent point");
    }
    Ok(classify_entities(
        vec![(label.to_owned(), series.last_value())],
        thresholds,
    ))
}

fn check_memory(source: &dyn Source, host: &HostPath, config: &Config) -> Result<Report, CheckError> {
    check_single(
        source,
        &format!("asPercent({})", host.metric("memory.memory-{used,free}")),
        "Memory usage percentage",
        config.memory,
    )
}

fn check_swap(source: &dyn Source, host: &HostPath, config: &Config) -> Result<Report, CheckError> {
    check_single(
        source,
        &format!("asPercent({})", host.metric("swap.swap-{used,free}")),
        "Swap usage percentage",
        config.swap,
    )
}

fn check_load(source: &dyn Source, host: &HostPath, config: &Config) -> Result<Report, CheckError> {
    check_single(
        source,
        &host.metric("load.load.shortterm"),
        "Load average",
        config.load,
    )
}

/// User plus system time of every core
fn check_cpu(source: &dyn Source, host: &HostPath, config: &Config) -> Result<Report, CheckError> {
    let user = source.fetch(&host.metric("cpu-*.cpu-user"))?;
    let system = source.fetch(&host.metric("cpu-*.cpu-system"))?;

    let per_cpu = paired(&user, &system, &identifier(host, "cpu")?, |u, s| Some(u + s));
    Ok(classify_entities(
        labelled(per_cpu, |id| format!("CPU {} usage percentage", id)),
        config.cpu,
    ))
}

/// Read plus write operations of every device, as a percent of `disk.iops`
fn check_disk(source: &dyn Source, host: &HostPath, config: &Config) -> Result<Report, CheckError> {
    let ops = |direction: &str| {
        format!(
            "asPercent({},{})",
            host.metric(&format!(
                "disk-{}.disk_ops.{}",
                config.disk.devices, direction
            )),
            config.disk.iops
        )
    };
    let read = source.fetch(&ops("read"))?;
    let write = source.fetch(&ops("write"))?;

    let per_disk = paired(&read, &write, &identifier(host, "disk")?, |r, w| Some(r + w));
    Ok(classify_entities(
        labelled(per_disk, |id| format!("Disk {} activity percentage", id)),
        config.disk.thresholds(),
    ))
}

/// Space used on every filesystem
///
/// The percentage is worked out here rather than with graphite's
/// `asPercent`, which would divide by the total of every filesystem.
fn check_df(source: &dyn Source, host: &HostPath, config: &Config) -> Result<Report, CheckError> {
    let used = source.fetch(&host.metric("df-*.df_complex-used"))?;
    let free = source.fetch(&host.metric("df-*.df_complex-free"))?;

    let per_fs = paired(&used, &free, &identifier(host, "df")?, percent_used);
    Ok(classify_entities(
        labelled(per_fs, |id| format!("Disk {} space used percentage", id)),
        config.df,
    ))
}

fn percent_used(used: f64, free: f64) -> Option<f64> {
    let total = used + free;
    if total == 0.0 {
        None
    } else {
        Some(used / total * 100.0)
    }
}

/// Traffic in each direction of every interface, as a percent of `interface.mbps`
fn check_interface(
    source: &dyn Source,
    host: &HostPath,
    config: &Config,
) -> Result<Report, CheckError> {
    let bytes_per_second = config.interface.mbps * BYTES_PER_MEGABIT;
    let data = source.fetch(&format!(
        "asPercent({},{})",
        host.metric("interface-*.if_octets.*"),
        bytes_per_second
    ))?;

    let pattern = Regex::new(&format!(
        r"{}\.interface-([^.]+)\.if_octets\.([^.,)]+)",
        regex::escape(host.as_str())
    ))?;
    let entities = data
        .iter()
        .filter_map(|series| match pattern.captures(&series.target) {
            Some(caps) => Some((
                format!("Interface {} {} usage percentage", &caps[1], &caps[2]),
                series.last_value(),
            )),
            None => {
                warn!(series = %series.target, "no interface in target, skipping");
                None
            }
        })
        .collect();
    Ok(classify_entities(entities, config.interface.thresholds()))
}
