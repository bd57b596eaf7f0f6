//! Blocking HTTP clients for the cluster listing API and the time-series query API.

use std::time::Duration;

use anyhow::{Context as _, Result};
use reqwest::blocking::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};

mod elastic;
mod prometheus;

pub use elastic::ElasticClient;
pub use prometheus::PrometheusClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticSettings {
    /// Tried in order until one answers.
    pub hosts: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for ElasticSettings {
    fn default() -> Self {
        Self {
            hosts: vec!["http://localhost:9200".to_string()],
            username: None,
            password: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusSettings {
    /// Instant query endpoint, e.g. `http://host:9090/api/v1/query`.
    pub url: String,
    /// Value of the `job` label every query is scoped to.
    pub job: String,
    pub timeout_secs: Option<u64>,
}

impl Default for PrometheusSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9090/api/v1/query".to_string(),
            job: "Lucy3.0 ES Cluster".to_string(),
            timeout_secs: None,
        }
    }
}

fn build_http_client(timeout_secs: Option<u64>) -> Result<Client> {
    let mut builder: ClientBuilder = Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().context("failed to build HTTP client")
}
