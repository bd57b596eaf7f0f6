use anyhow::Result;
use serde::Serialize;
use std::fmt;

pub mod group;
pub mod reading;
pub mod series;
pub mod size;
pub mod source;

pub use group::{GroupKey, GroupTotals};
pub use reading::{MetricFamily, NO_RESULT_MARKER, Reading, format_thousands};
pub use series::{GroupSpec, query_groups};
pub use size::{SizeParseError, parse_size};
pub use source::{
    AllocationRecord, ListingSource, QueryResponse, SeriesSample, ShardRecord, TimeSeriesSource,
};

/// Data collection context: the two backends plus the configured rack groups.
pub struct CollectionContext<'a> {
    listing: &'a dyn ListingSource,
    series: &'a dyn TimeSeriesSource,
    groups: Vec<GroupSpec>,
    job: String,
}

impl<'a> CollectionContext<'a> {
    pub fn new(listing: &'a dyn ListingSource, series: &'a dyn TimeSeriesSource) -> Self {
        Self {
            listing,
            series,
            groups: Vec::new(),
            job: String::new(),
        }
    }

    pub fn with_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = GroupSpec>,
    {
        self.groups = groups.into_iter().collect();
        self
    }

    pub fn with_job<S: Into<String>>(mut self, job: S) -> Self {
        self.job = job.into();
        self
    }

    pub fn listing(&self) -> &dyn ListingSource {
        self.listing
    }

    pub fn series(&self) -> &dyn TimeSeriesSource {
        self.series
    }

    pub fn groups(&self) -> &[GroupSpec] {
        &self.groups
    }

    /// Prometheus `job` label the utilization queries are scoped to.
    pub fn job(&self) -> &str {
        &self.job
    }
}

/// Collector metadata used for ordering, rendering and logging.
#[derive(Debug, Clone, Copy)]
pub struct CollectorMetadata {
    pub id: &'static str,
    pub title: &'static str,
    pub family: MetricFamily,
    /// Position in the run; lower runs first.
    pub order: u16,
}

/// Section status describing success or degraded collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Success,
    Degraded,
    Error,
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SectionStatus::Success => "success",
            SectionStatus::Degraded => "degraded",
            SectionStatus::Error => "error",
        };
        f.write_str(value)
    }
}

/// Result produced by a collector: the readings of one metric family.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    pub family: MetricFamily,
    pub status: SectionStatus,
    pub summary: Option<String>,
    pub readings: Vec<Reading>,
    pub notes: Vec<String>,
}

impl Section {
    /// Builds a section from readings; any diagnostic reading degrades it.
    pub fn from_readings(metadata: CollectorMetadata, readings: Vec<Reading>) -> Self {
        let status = if readings.iter().all(Reading::is_value) {
            SectionStatus::Success
        } else {
            SectionStatus::Degraded
        };

        Self {
            id: metadata.id,
            title: metadata.title,
            family: metadata.family,
            status,
            summary: None,
            readings,
            notes: Vec::new(),
        }
    }

    pub fn error(metadata: CollectorMetadata, error: String) -> Self {
        Self {
            id: metadata.id,
            title: metadata.title,
            family: metadata.family,
            status: SectionStatus::Error,
            summary: Some(error),
            readings: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Operator-facing lines, one per reading. A failed section yields its error line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.readings.iter().map(ToString::to_string).collect();
        if self.status == SectionStatus::Error {
            if let Some(error) = &self.summary {
                lines.push(format!("예외 발생: {error}"));
            }
        }
        lines
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }
}

/// Common interface for metric collection modules.
pub trait Collector: Send + Sync + 'static {
    fn metadata(&self) -> CollectorMetadata;
    fn collect(&self, ctx: &CollectionContext<'_>) -> Result<Section>;
}

/// Descriptor of a compile-time registry entry.
pub struct CollectorRegistration {
    pub constructor: fn() -> Box<dyn Collector>,
}

inventory::collect!(CollectorRegistration);

pub use inventory;

/// Helper macro to register a collector inside a module.
#[macro_export]
macro_rules! register_collector {
    ($ctor:expr) => {
        ::rackstat_sdk::inventory::submit! {
            ::rackstat_sdk::CollectorRegistration {
                constructor: $ctor,
            }
        }
    };
}

pub fn iter_registered_collectors() -> impl Iterator<Item = &'static CollectorRegistration> {
    inventory::iter::<CollectorRegistration>.into_iter()
}

/// Registered collectors instantiated and sorted by their run order.
pub fn ordered_collectors() -> Vec<Box<dyn Collector>> {
    let mut collectors: Vec<Box<dyn Collector>> = iter_registered_collectors()
        .map(|entry| (entry.constructor)())
        .collect();
    collectors.sort_by_key(|collector| collector.metadata().order);
    collectors
}
