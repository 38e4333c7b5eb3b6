//! Interact with graphite
//!
//! This module defines the types that graphite's json render api returns,
//! and the `Source` trait that checks fetch them through. `Graphite` is the
//! real, blocking http implementation of `Source`.

use std::fmt;

use chrono::naive::serde::ts_seconds::deserialize as from_ts_seconds;
use chrono::naive::NaiveDateTime;
use itertools::Itertools;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::Config;

/// All the data for one fully-resolved target
///
/// Any given graphite api call can result in getting data for multiple targets
#[derive(PartialEq, Debug, Deserialize, Clone)]
pub struct GraphiteData {
    #[serde(rename = "datapoints")]
    pub points: Vec<DataPoint>,
    pub target: String,
}

impl GraphiteData {
    /// The value of the most recent point, if graphite had one
    pub fn last_value(&self) -> Option<f64> {
        self.points.last().and_then(|point| point.val)
    }
}

/// One of the datapoints that graphite has returned.
///
/// Graphite always returns all values in its time range, even if it hasn't got
/// any data for them, so the val might not exist.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct DataPoint {
    pub val: Option<f64>,
    #[serde(deserialize_with = "from_ts_seconds")]
    pub time: NaiveDateTime,
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (at {})",
            self.val.map_or("null".into(), |v| format!("{:.2}", v)),
            self.time.format("%H:%Mz")
        )
    }
}

#[derive(Debug, Error)]
pub enum GraphiteError {
    #[error("invalid graphite url {url}: {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },
    #[error("error talking to graphite: {0}")]
    Http(#[from] reqwest::Error),
    #[error("graphite returned invalid json for {url}: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },
}

/// Somewhere that series can be fetched from
pub trait Source {
    /// Fetch the smoothed series matching a graphite target expression
    fn fetch(&self, expression: &str) -> Result<Vec<GraphiteData>, GraphiteError>;
}

/// A graphite server reached over http
pub struct Graphite {
    client: Client,
    url: String,
    window: u64,
    samples: u64,
}

impl Graphite {
    pub fn new(config: &Config) -> Result<Graphite, GraphiteError> {
        Ok(Graphite {
            client: Client::builder().build()?,
            url: config.graphite.url.clone(),
            window: config.window,
            samples: config.samples(),
        })
    }
}

impl Source for Graphite {
    fn fetch(&self, expression: &str) -> Result<Vec<GraphiteData>, GraphiteError> {
        let url = render_url(&self.url, expression, self.samples, self.window)?;
        debug!(url = %decoded(&url), "querying graphite");

        let body = self
            .client
            .get(url.clone())
            .send()?
            .error_for_status()?
            .text()?;
        debug!(%body, "graphite responded");

        serde_json::from_str(&body).map_err(|source| GraphiteError::Json {
            url: decoded(&url),
            source,
        })
    }
}

/// Build the render api url that smooths `expression` over the window
pub fn render_url(
    base: &str,
    expression: &str,
    samples: u64,
    window: u64,
) -> Result<Url, GraphiteError> {
    let endpoint = format!("{}/render/", base.trim_end_matches('/'));
    let mut url = Url::parse(&endpoint).map_err(|source| GraphiteError::Url {
        url: endpoint.clone(),
        source,
    })?;
    url.query_pairs_mut()
        .append_pair("format", "json")
        .append_pair(
            "target",
            &format!("movingAverage({},{})", expression, samples),
        )
        .append_pair("from", &format!("-{}seconds", window));
    Ok(url)
}

/// The url with its query string human readable, for logging
fn decoded(url: &Url) -> String {
    let mut base = url.clone();
    base.set_query(None);
    format!(
        "{}?{}",
        base,
        url.query_pairs()
            .map(|(k, v)| format!("{}={}", k, v))
            .join("&")
    )
}
