use anyhow::Result;
use rackstat_sdk::{
    CollectionContext, Collector, CollectorMetadata, GroupSpec, MetricFamily, Section,
    query_groups, register_collector,
};
use tracing::info;

const METADATA: CollectorMetadata = CollectorMetadata {
    id: "cpu",
    title: "CPU 평균 사용량",
    family: MetricFamily::Cpu,
    order: 20,
};

struct CpuCollector;

impl Collector for CpuCollector {
    fn metadata(&self) -> CollectorMetadata {
        METADATA
    }

    fn collect(&self, ctx: &CollectionContext<'_>) -> Result<Section> {
        let readings = query_groups(ctx.series(), METADATA.family, ctx.groups(), |spec| {
            cpu_query(spec, ctx.job())
        });
        let section = Section::from_readings(METADATA, readings);
        info!(groups = ctx.groups().len(), status = %section.status, "cpu utilization collected");
        Ok(section)
    }
}

fn create_collector() -> Box<dyn Collector> {
    Box::new(CpuCollector)
}

register_collector!(create_collector);

/// Busy CPU percentage averaged over five days, labelled with the group name.
fn cpu_query(spec: &GroupSpec, job: &str) -> String {
    format!(
        concat!(
            "label_replace(",
            "avg(",
            "100 - avg_over_time(",
            "rate(node_cpu_seconds_total{{mode=\"idle\", hostname=~\"{pattern}\", job=\"{job}\"}}[5m])",
            "[5d:]",
            ") * 100",
            "),",
            "\"group\", \"{group}\", \"\", \"\"",
            ")"
        ),
        pattern = spec.host_pattern,
        job = job,
        group = spec.name,
    )
}
