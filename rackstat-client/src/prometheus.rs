use std::collections::BTreeMap;

use anyhow::Result;
use rackstat_sdk::{QueryResponse, SeriesSample, TimeSeriesSource};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{PrometheusSettings, build_http_client};

/// Instant-query client for `/api/v1/query`.
pub struct PrometheusClient {
    http: Client,
    url: String,
}

impl PrometheusClient {
    pub fn new(settings: &PrometheusSettings) -> Result<Self> {
        Ok(Self {
            http: build_http_client(settings.timeout_secs)?,
            url: settings.url.clone(),
        })
    }
}

impl TimeSeriesSource for PrometheusClient {
    fn query(&self, expression: &str) -> QueryResponse {
        let response = match self
            .http
            .get(&self.url)
            .query(&[("query", expression)])
            .send()
        {
            Ok(response) => response,
            Err(error) => return QueryResponse::Transport(error.to_string()),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return QueryResponse::Status(status.as_u16());
        }

        match response.json::<QueryEnvelope>() {
            Ok(envelope) => {
                let samples = envelope.into_samples();
                debug!(rows = samples.len(), "time series query answered");
                QueryResponse::Samples(samples)
            }
            Err(error) => QueryResponse::Transport(format!("invalid response body: {error}")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct QueryEnvelope {
    #[serde(default)]
    data: QueryData,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    /// `[<unix seconds>, "<value>"]`
    value: (f64, String),
}

impl QueryEnvelope {
    fn into_samples(self) -> Vec<SeriesSample> {
        self.data
            .result
            .into_iter()
            .map(|sample| SeriesSample {
                labels: sample.metric,
                value: sample.value.1,
            })
            .collect()
    }
}
