use std::cell::RefCell;
use std::collections::HashMap;

use grallect::checks::{CheckError, Metric};
use grallect::config::{Config, Thresholds};
use grallect::graphite::{GraphiteData, GraphiteError, Source};
use grallect::host::HostPath;
use grallect::report::Report;
use grallect::Status;

/// Canned graphite responses, keyed by target expression
///
/// Expressions without a canned response get no series back. Every
/// expression asked for is recorded.
#[derive(Default)]
struct FakeGraphite {
    responses: HashMap<String, Vec<GraphiteData>>,
    asked: RefCell<Vec<String>>,
}

impl FakeGraphite {
    fn with(mut self, expression: &str, json: &str) -> FakeGraphite {
        self.responses
            .insert(expression.to_owned(), serde_json::from_str(json).unwrap());
        self
    }
}

impl Source for FakeGraphite {
    fn fetch(&self, expression: &str) -> Result<Vec<GraphiteData>, GraphiteError> {
        self.asked.borrow_mut().push(expression.to_owned());
        Ok(self.responses.get(expression).cloned().unwrap_or_default())
    }
}

/// A graphite that returns garbage
struct BrokenGraphite;

impl Source for BrokenGraphite {
    fn fetch(&self, _expression: &str) -> Result<Vec<GraphiteData>, GraphiteError> {
        let source = serde_json::from_str::<Vec<GraphiteData>>("<html>").unwrap_err();
        Err(GraphiteError::Json {
            url: "http://graphite/render/".to_owned(),
            source,
        })
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.memory = Thresholds::new(80.0, 95.0);
    config
}

fn host(config: &Config) -> HostPath {
    HostPath::new("web01.example.com", &config.collectd)
}

fn run(metric: Metric, graphite: &FakeGraphite) -> Report {
    let config = config();
    metric.check(graphite, &host(&config), &config).unwrap()
}

fn single(target: &str, value: &str) -> String {
    format!(
        r#"[{{"target": "{}", "datapoints": [[1.0, 90], [{}, 100]]}}]"#,
        target, value
    )
}

#[test]
fn memory_ok() {
    let graphite = FakeGraphite::default().with(
        "asPercent(collectd.web01_example_com.memory.memory-{used,free})",
        &single("memory", "42.0"),
    );
    let report = run(Metric::Memory, &graphite);
    assert_eq!(report.status, Status::Ok);
    assert_eq!(report.to_string(), "OK: Memory usage percentage was 42.0. ");
}

#[test]
fn memory_critical() {
    let graphite = FakeGraphite::default().with(
        "asPercent(collectd.web01_example_com.memory.memory-{used,free})",
        &single("memory", "96.0"),
    );
    let report = run(Metric::Memory, &graphite);
    assert_eq!(report.status, Status::Critical);
    assert_eq!(report.status.code(), 2);
    assert_eq!(
        report.to_string(),
        "CRITICAL: Memory usage percentage was 96.0. "
    );
}

#[test]
fn swap_and_load_use_their_own_thresholds() {
    let graphite = FakeGraphite::default()
        .with(
            "asPercent(collectd.web01_example_com.swap.swap-{used,free})",
            &single("swap", "60"),
        )
        .with(
            "collectd.web01_example_com.load.load.shortterm",
            &single("load", "8.5"),
        );
    let swap = run(Metric::Swap, &graphite);
    assert_eq!(swap.to_string(), "WARNING: Swap usage percentage was 60.0. ");

    let load = run(Metric::Load, &graphite);
    assert_eq!(load.to_string(), "CRITICAL: Load average was 8.5. ");
}

#[test]
fn null_latest_value_is_unknown() {
    let graphite = FakeGraphite::default().with(
        "collectd.web01_example_com.load.load.shortterm",
        &single("load", "null"),
    );
    let report = run(Metric::Load, &graphite);
    assert_eq!(report.status, Status::Unknown);
    assert_eq!(report.to_string(), "UNKNOWN: No data was found");
}

#[test]
fn no_series_is_unknown_for_every_metric() {
    for metric in Metric::all() {
        let report = run(*metric, &FakeGraphite::default());
        assert_eq!(report.status, Status::Unknown, "{}", metric);
        assert_eq!(report.to_string(), "UNKNOWN: No data was found");
        assert!(report.results.is_empty());
    }
}

#[test]
fn cpu_sums_user_and_system_per_core() {
    let graphite = FakeGraphite::default()
        .with(
            "collectd.web01_example_com.cpu-*.cpu-user",
            r#"[
                {"target": "movingAverage(collectd.web01_example_com.cpu-0.cpu-user,6)", "datapoints": [[10, 100]]},
                {"target": "movingAverage(collectd.web01_example_com.cpu-1.cpu-user,6)", "datapoints": [[70, 100]]}
            ]"#,
        )
        .with(
            "collectd.web01_example_com.cpu-*.cpu-system",
            r#"[
                {"target": "movingAverage(collectd.web01_example_com.cpu-1.cpu-system,6)", "datapoints": [[15.5, 100]]},
                {"target": "movingAverage(collectd.web01_example_com.cpu-0.cpu-system,6)", "datapoints": [[2.5, 100]]}
            ]"#,
        );
    let report = run(Metric::Cpu, &graphite);
    assert_eq!(report.status, Status::Warning);
    assert_eq!(
        report.to_string(),
        "WARNING: CPU 0 usage percentage was 12.5. CPU 1 usage percentage was 85.5. "
    );
    assert_eq!(
        *graphite.asked.borrow(),
        vec![
            "collectd.web01_example_com.cpu-*.cpu-user".to_owned(),
            "collectd.web01_example_com.cpu-*.cpu-system".to_owned(),
        ]
    );
}

#[test]
fn host_named_like_a_node_keeps_core_ids() {
    let config = config();
    let host = HostPath::new("cpu-box.example.com", &config.collectd);
    let graphite = FakeGraphite::default()
        .with(
            "collectd.cpu-box_example_com.cpu-*.cpu-user",
            r#"[
                {"target": "movingAverage(collectd.cpu-box_example_com.cpu-0.cpu-user,6)", "datapoints": [[90, 100]]},
                {"target": "movingAverage(collectd.cpu-box_example_com.cpu-1.cpu-user,6)", "datapoints": [[1, 100]]}
            ]"#,
        )
        .with(
            "collectd.cpu-box_example_com.cpu-*.cpu-system",
            r#"[
                {"target": "movingAverage(collectd.cpu-box_example_com.cpu-0.cpu-system,6)", "datapoints": [[2, 100]]},
                {"target": "movingAverage(collectd.cpu-box_example_com.cpu-1.cpu-system,6)", "datapoints": [[1, 100]]}
            ]"#,
        );
    let report = Metric::Cpu.check(&graphite, &host, &config).unwrap();
    assert_eq!(
        report.to_string(),
        "WARNING: CPU 0 usage percentage was 92.0. CPU 1 usage percentage was 2.0. "
    );
}

#[test]
fn cpu_core_missing_from_one_fetch_is_unknown() {
    let graphite = FakeGraphite::default()
        .with(
            "collectd.web01_example_com.cpu-*.cpu-user",
            r#"[
                {"target": "collectd.web01_example_com.cpu-0.cpu-user", "datapoints": [[10, 100]]},
                {"target": "collectd.web01_example_com.cpu-1.cpu-user", "datapoints": [[10, 100]]}
            ]"#,
        )
        .with(
            "collectd.web01_example_com.cpu-*.cpu-system",
            r#"[
                {"target": "collectd.web01_example_com.cpu-0.cpu-system", "datapoints": [[1, 100]]}
            ]"#,
        );
    let report = run(Metric::Cpu, &graphite);
    assert_eq!(report.status, Status::Unknown);
}

#[test]
fn disk_asks_for_percent_of_iops() {
    let graphite = FakeGraphite::default()
        .with(
            "asPercent(collectd.web01_example_com.disk-sd*.disk_ops.read,100)",
            r#"[
                {"target": "asPercent(collectd.web01_example_com.disk-sda.disk_ops.read,100)", "datapoints": [[50, 100]]}
            ]"#,
        )
        .with(
            "asPercent(collectd.web01_example_com.disk-sd*.disk_ops.write,100)",
            r#"[
                {"target": "asPercent(collectd.web01_example_com.disk-sda.disk_ops.write,100)", "datapoints": [[46, 100]]}
            ]"#,
        );
    let report = run(Metric::Disk, &graphite);
    assert_eq!(
        report.to_string(),
        "CRITICAL: Disk sda activity percentage was 96.0. "
    );
}

#[test]
fn df_computes_percentages_per_filesystem() {
    let graphite = FakeGraphite::default()
        .with(
            "collectd.web01_example_com.df-*.df_complex-used",
            r#"[
                {"target": "collectd.web01_example_com.df-root.df_complex-used", "datapoints": [[850, 100]]},
                {"target": "collectd.web01_example_com.df-boot.df_complex-used", "datapoints": [[10, 100]]}
            ]"#,
        )
        .with(
            "collectd.web01_example_com.df-*.df_complex-free",
            r#"[
                {"target": "collectd.web01_example_com.df-root.df_complex-free", "datapoints": [[150, 100]]},
                {"target": "collectd.web01_example_com.df-boot.df_complex-free", "datapoints": [[90, 100]]}
            ]"#,
        );
    let report = run(Metric::Df, &graphite);
    assert_eq!(report.status, Status::Warning);
    assert_eq!(
        report.to_string(),
        "WARNING: Disk root space used percentage was 85.0. \
         Disk boot space used percentage was 10.0. "
    );
}

#[test]
fn interface_reports_each_direction() {
    let graphite = FakeGraphite::default().with(
        "asPercent(collectd.web01_example_com.interface-*.if_octets.*,13107200)",
        r#"[
            {"target": "movingAverage(asPercent(collectd.web01_example_com.interface-eth0.if_octets.rx,13107200),6)", "datapoints": [[12.5, 100]]},
            {"target": "movingAverage(asPercent(collectd.web01_example_com.interface-eth0.if_octets.tx,13107200),6)", "datapoints": [[3, 100]]}
        ]"#,
    );
    let report = run(Metric::Interface, &graphite);
    assert_eq!(
        report.to_string(),
        "OK: Interface eth0 rx usage percentage was 12.5. \
         Interface eth0 tx usage percentage was 3.0. "
    );
}

#[test]
fn graphite_errors_are_check_errors() {
    let config = config();
    match Metric::Cpu.check(&BrokenGraphite, &host(&config), &config) {
        Err(CheckError::Graphite(GraphiteError::Json { .. })) => {}
        other => panic!("expected a json error, got {:?}", other),
    }
}
