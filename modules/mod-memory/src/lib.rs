use anyhow::Result;
use rackstat_sdk::{
    CollectionContext, Collector, CollectorMetadata, GroupSpec, MetricFamily, Section,
    query_groups, register_collector,
};
use tracing::info;

const METADATA: CollectorMetadata = CollectorMetadata {
    id: "memory",
    title: "Memory 평균 사용량",
    family: MetricFamily::Memory,
    order: 30,
};

struct MemoryCollector;

impl Collector for MemoryCollector {
    fn metadata(&self) -> CollectorMetadata {
        METADATA
    }

    fn collect(&self, ctx: &CollectionContext<'_>) -> Result<Section> {
        let readings = query_groups(ctx.series(), METADATA.family, ctx.groups(), |spec| {
            memory_query(spec, ctx.job())
        });
        let section = Section::from_readings(METADATA, readings);
        info!(groups = ctx.groups().len(), status = %section.status, "memory utilization collected");
        Ok(section)
    }
}

fn create_collector() -> Box<dyn Collector> {
    Box::new(MemoryCollector)
}

register_collector!(create_collector);

/// Used-memory percentage over the last 31 days, labelled with the group name.
fn memory_query(spec: &GroupSpec, job: &str) -> String {
    let selector = format!("{{hostname=~\"{}\", job=\"{}\"}}", spec.host_pattern, job);
    let total = format!("avg_over_time(node_memory_MemTotal_bytes{selector}[31d])");
    let available = format!("avg_over_time(node_memory_MemAvailable_bytes{selector}[31d])");

    format!(
        "label_replace(avg(({total} - {available}) / {total} * 100), \"group\", \"{group}\", \"\", \"\")",
        group = spec.name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackstat_sdk::{
        AllocationRecord, ListingSource, QueryResponse, SectionStatus, SeriesSample, ShardRecord,
        TimeSeriesSource,
    };

    #[test]
    fn query_reads_total_and_available_for_one_group() {
        let query = memory_query(&GroupSpec::new("RC17"), "ES Cluster");
        assert_eq!(query.matches(r#"hostname=~"RC17.*", job="ES Cluster""#).count(), 3);
        assert!(query.contains("node_memory_MemAvailable_bytes"));
        assert!(query.contains("[31d]"));
        assert!(query.ends_with(r#""group", "RC17", "", "")"#));
    }

    /// Healthy for RC10, empty for every other group.
    struct PartialSeries;

    impl ListingSource for PartialSeries {
        fn allocation(&self) -> Result<Vec<AllocationRecord>> {
            Ok(Vec::new())
        }

        fn shards(&self) -> Result<Vec<ShardRecord>> {
            Ok(Vec::new())
        }
    }

    impl TimeSeriesSource for PartialSeries {
        fn query(&self, expression: &str) -> QueryResponse {
            if expression.contains("RC10.*") {
                QueryResponse::Samples(vec![SeriesSample::new("65.8")])
            } else {
                QueryResponse::Samples(Vec::new())
            }
        }
    }

    #[test]
    fn empty_group_yields_marker_and_degrades_section() {
        let source = PartialSeries;
        let ctx = CollectionContext::new(&source, &source)
            .with_groups(["RC10", "RC12"].map(GroupSpec::new));

        let section = MemoryCollector.collect(&ctx).expect("section");
        assert_eq!(section.status, SectionStatus::Degraded);
        assert_eq!(
            section.lines(),
            vec![r#"{group="RC10"}  66%"#.to_string(), "RC12 결과 없음".to_string()]
        );
    }
}
