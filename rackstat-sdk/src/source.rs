//! Narrow views of the two monitoring backends.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Row of the cluster allocation listing (`_cat/allocation`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(rename = "disk.used", default)]
    pub disk_used: Option<String>,
    #[serde(rename = "disk.total", default)]
    pub disk_total: Option<String>,
}

impl AllocationRecord {
    pub fn new(node: &str, disk_used: &str, disk_total: &str) -> Self {
        Self {
            node: Some(node.to_string()),
            disk_used: Some(disk_used.to_string()),
            disk_total: Some(disk_total.to_string()),
        }
    }
}

/// Row of the shard listing (`_cat/shards`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardRecord {
    #[serde(default)]
    pub prirep: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub docs: Option<String>,
}

impl ShardRecord {
    pub fn new(prirep: &str, node: &str, docs: &str) -> Self {
        Self {
            prirep: Some(prirep.to_string()),
            node: Some(node.to_string()),
            docs: Some(docs.to_string()),
        }
    }

    pub fn is_primary(&self) -> bool {
        self.prirep.as_deref() == Some("p")
    }
}

/// One instant-vector sample: its labels and the raw value string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSample {
    pub labels: BTreeMap<String, String>,
    pub value: String,
}

impl SeriesSample {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            labels: BTreeMap::new(),
            value: value.into(),
        }
    }

    pub fn with_label(mut self, name: &str, value: &str) -> Self {
        self.labels.insert(name.to_string(), value.to_string());
        self
    }
}

/// Outcome of one time-series query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    Samples(Vec<SeriesSample>),
    /// The backend answered with a non-200 status.
    Status(u16),
    /// The request never completed.
    Transport(String),
}

pub trait ListingSource {
    fn allocation(&self) -> Result<Vec<AllocationRecord>>;
    fn shards(&self) -> Result<Vec<ShardRecord>>;
}

pub trait TimeSeriesSource {
    fn query(&self, expression: &str) -> QueryResponse;
}
