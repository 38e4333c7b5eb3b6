use std::fmt;

use crate::config::CollectdConfig;

/// The graphite path prefix that collectd files a host's metrics under
///
/// collectd replaces the dots in a hostname so that a host doesn't turn into
/// a nested tree of graphite nodes: `web01.example.com` with the default
/// config lives at `collectd.web01_example_com`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostPath(String);

impl HostPath {
    pub fn new(host: &str, collectd: &CollectdConfig) -> HostPath {
        HostPath(format(
            host,
            &collectd.escape_character,
            &collectd.prefix,
            &collectd.postfix,
        ))
    }

    /// The full graphite path of one of this host's metrics
    pub fn metric(&self, suffix: &str) -> String {
        format!("{}.{}", self.0, suffix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn format(host: &str, escape: &str, prefix: &str, postfix: &str) -> String {
    format!("{}{}{}", prefix, host.replace('.', escape), postfix)
}
