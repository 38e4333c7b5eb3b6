//! Configuration loaded from a json file
//!
//! Every key has a built-in default, so a config file only has to mention
//! what differs from it.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graphite: GraphiteConfig,
    pub collectd: CollectdConfig,
    /// Seconds of data to smooth over
    pub window: u64,
    pub cpu: Thresholds,
    pub memory: Thresholds,
    pub swap: Thresholds,
    pub load: Thresholds,
    pub disk: DiskConfig,
    pub df: Thresholds,
    pub interface: InterfaceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GraphiteConfig {
    pub url: String,
}

/// How collectd names the metrics of a host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CollectdConfig {
    pub prefix: String,
    pub postfix: String,
    pub escape_character: String,
    /// Seconds between two collectd samples
    pub interval: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    pub warning: f64,
    pub critical: f64,
    /// Operations per second that count as 100% busy
    pub iops: f64,
    /// Glob selecting the devices to check, e.g. `sd*` or `{sda,nvme0n1}`
    pub devices: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    pub warning: f64,
    pub critical: f64,
    /// Link speed in megabits per second
    pub mbps: f64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            graphite: GraphiteConfig::default(),
            collectd: CollectdConfig::default(),
            window: 60,
            cpu: Thresholds::new(80.0, 95.0),
            memory: Thresholds::new(80.0, 95.0),
            swap: Thresholds::new(50.0, 80.0),
            load: Thresholds::new(4.0, 8.0),
            disk: DiskConfig::default(),
            df: Thresholds::new(80.0, 90.0),
            interface: InterfaceConfig::default(),
        }
    }
}

impl Default for GraphiteConfig {
    fn default() -> GraphiteConfig {
        GraphiteConfig {
            url: "http://localhost".to_owned(),
        }
    }
}

impl Default for CollectdConfig {
    fn default() -> CollectdConfig {
        CollectdConfig {
            prefix: "collectd.".to_owned(),
            postfix: String::new(),
            escape_character: "_".to_owned(),
            interval: 10,
        }
    }
}

impl Default for DiskConfig {
    fn default() -> DiskConfig {
        DiskConfig {
            warning: 80.0,
            critical: 95.0,
            iops: 100.0,
            devices: "sd*".to_owned(),
        }
    }
}

impl Default for InterfaceConfig {
    fn default() -> InterfaceConfig {
        InterfaceConfig {
            warning: 80.0,
            critical: 95.0,
            mbps: 100.0,
        }
    }
}

impl Thresholds {
    pub fn new(warning: f64, critical: f64) -> Thresholds {
        Thresholds { warning, critical }
    }
}

impl DiskConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.warning, self.critical)
    }
}

impl InterfaceConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.warning, self.critical)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("unable to parse json in {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        parse(&text, &path.display().to_string())
    }

    pub fn from_json(text: &str) -> Result<Config, ConfigError> {
        parse(text, "<string>")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collectd.interval == 0 {
            return Err(ConfigError::Invalid(
                "collectd.interval must be at least 1".to_owned(),
            ));
        }
        if self.window == 0 {
            return Err(ConfigError::Invalid("window must be at least 1".to_owned()));
        }
        Ok(())
    }

    /// How many collectd samples fit into the window, at least one
    pub fn samples(&self) -> u64 {
        (self.window / self.collectd.interval).max(1)
    }
}

fn parse(text: &str, path: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}
