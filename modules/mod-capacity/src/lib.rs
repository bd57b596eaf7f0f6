use anyhow::Result;
use rackstat_sdk::{
    AllocationRecord, CollectionContext, Collector, CollectorMetadata, GroupKey, GroupTotals,
    MetricFamily, Reading, Section, parse_size, register_collector,
};
use tracing::{info, warn};

const METADATA: CollectorMetadata = CollectorMetadata {
    id: "capacity",
    title: "HDD 평균 사용량",
    family: MetricFamily::Capacity,
    order: 10,
};

struct CapacityCollector;

impl Collector for CapacityCollector {
    fn metadata(&self) -> CollectorMetadata {
        METADATA
    }

    fn collect(&self, ctx: &CollectionContext<'_>) -> Result<Section> {
        match ctx.listing().allocation() {
            Ok(records) => {
                let mut notes = Vec::new();
                let totals = aggregate(&records, &mut notes);
                let readings = readings_from_totals(&totals);
                info!(
                    records = records.len(),
                    groups = readings.len(),
                    skipped = notes.len(),
                    "aggregated disk allocation"
                );

                let mut section = Section::from_readings(METADATA, readings);
                section.summary = Some(format!(
                    "{} racks from {} allocation rows",
                    totals.len(),
                    records.len()
                ));
                section.notes = notes;
                Ok(section)
            }
            Err(error) => {
                warn!(error = %error, "allocation listing unavailable");
                Ok(Section::error(METADATA, format!("{error:#}")))
            }
        }
    }
}

fn create_collector() -> Box<dyn Collector> {
    Box::new(CapacityCollector)
}

register_collector!(create_collector);

/// Running disk sums of one rack, in GB.
#[derive(Debug, Default, Clone, PartialEq)]
struct CapacityTotals {
    used_gb: f64,
    total_gb: f64,
    nodes: u64,
}

impl CapacityTotals {
    fn avg_used_gb(&self) -> u64 {
        ceil_average(self.used_gb, self.nodes)
    }

    fn avg_total_gb(&self) -> u64 {
        ceil_average(self.total_gb, self.nodes)
    }
}

/// Averages round up so that reported usage never understates the rack.
fn ceil_average(sum: f64, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    (sum / count as f64).ceil().max(0.0) as u64
}

fn usage_percent(avg_used: u64, avg_total: u64) -> u64 {
    if avg_total == 0 {
        return 0;
    }
    avg_used.saturating_mul(100) / avg_total
}

fn aggregate(records: &[AllocationRecord], notes: &mut Vec<String>) -> GroupTotals<CapacityTotals> {
    let mut totals: GroupTotals<CapacityTotals> = GroupTotals::new();

    for record in records {
        let Some(node) = record.node.as_deref().filter(|node| !node.is_empty()) else {
            continue;
        };
        let Some(group) = GroupKey::from_node(node) else {
            continue;
        };

        let used = parse_size(record.disk_used.as_deref().unwrap_or("0"));
        let total = parse_size(record.disk_total.as_deref().unwrap_or("0"));
        let (used, total) = match (used, total) {
            (Ok(used), Ok(total)) => (used, total),
            (Err(error), _) | (_, Err(error)) => {
                warn!(node, %error, "skipping allocation row");
                notes.push(format!("변환 실패: {node}, 에러: {error}"));
                continue;
            }
        };

        let entry = totals.entry(group);
        entry.used_gb += used;
        entry.total_gb += total;
        entry.nodes += 1;
    }

    totals
}

fn readings_from_totals(totals: &GroupTotals<CapacityTotals>) -> Vec<Reading> {
    totals
        .iter()
        .map(|(group, sums)| {
            let avg_used_gb = sums.avg_used_gb();
            let avg_total_gb = sums.avg_total_gb();
            Reading::Capacity {
                group: group.clone(),
                avg_used_gb,
                avg_total_gb,
                percent: usage_percent(avg_used_gb, avg_total_gb),
            }
        })
        .collect()
}
