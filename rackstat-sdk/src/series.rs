use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{GroupKey, MetricFamily, QueryResponse, Reading, SeriesSample, TimeSeriesSource};

/// A configured rack group and the host-name regex its queries are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub host_pattern: String,
}

impl GroupSpec {
    /// Group whose hosts are the ones named `<name>...`.
    pub fn new<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        let host_pattern = format!("{name}.*");
        Self { name, host_pattern }
    }

    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.name.clone())
    }
}

/// Issues one query per group, in order, and turns each outcome into readings.
///
/// A failing group yields a diagnostic reading and the loop moves on.
pub fn query_groups<F>(
    source: &dyn TimeSeriesSource,
    family: MetricFamily,
    groups: &[GroupSpec],
    build_query: F,
) -> Vec<Reading>
where
    F: Fn(&GroupSpec) -> String,
{
    let mut readings = Vec::new();

    for spec in groups {
        let group = spec.key();
        let expression = build_query(spec);
        debug!(%group, ?family, %expression, "querying time series");

        match source.query(&expression) {
            QueryResponse::Samples(samples) if samples.is_empty() => {
                warn!(%group, ?family, "time series query returned no rows");
                readings.push(Reading::NoResult { family, group });
            }
            QueryResponse::Samples(samples) => {
                readings.extend(
                    samples
                        .iter()
                        .map(|sample| reading_from_sample(family, &group, sample)),
                );
            }
            QueryResponse::Status(status) => {
                warn!(%group, ?family, status, "time series backend returned an error status");
                readings.push(Reading::HttpStatus {
                    family,
                    group,
                    status,
                });
            }
            QueryResponse::Transport(detail) => {
                warn!(%group, ?family, %detail, "time series request failed");
                readings.push(Reading::Transport {
                    family,
                    group,
                    detail,
                });
            }
        }
    }

    readings
}

fn reading_from_sample(family: MetricFamily, group: &GroupKey, sample: &SeriesSample) -> Reading {
    match sample.value.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Reading::Utilization {
            family,
            group: group.clone(),
            percent: value.round_ties_even() as i64,
        },
        _ => {
            warn!(%group, ?family, raw = %sample.value, "unparsable time series value");
            Reading::Unparsable {
                family,
                group: group.clone(),
                raw: sample.value.clone(),
            }
        }
    }
}
