use anyhow::Result;
use rackstat_sdk::{
    CollectionContext, Collector, CollectorMetadata, GroupKey, GroupTotals, MetricFamily, Reading,
    Section, ShardRecord, register_collector,
};
use tracing::{debug, info, warn};

const METADATA: CollectorMetadata = CollectorMetadata {
    id: "docs",
    title: "문서 총합",
    family: MetricFamily::Documents,
    order: 40,
};

struct DocsCollector;

impl Collector for DocsCollector {
    fn metadata(&self) -> CollectorMetadata {
        METADATA
    }

    fn collect(&self, ctx: &CollectionContext<'_>) -> Result<Section> {
        match ctx.listing().shards() {
            Ok(shards) => {
                let totals = sum_primary_docs(&shards);
                info!(shards = shards.len(), groups = totals.len(), "summed primary documents");

                let readings = totals
                    .into_iter()
                    .map(|(group, total)| Reading::DocCount { group, total })
                    .collect();
                Ok(Section::from_readings(METADATA, readings))
            }
            Err(error) => {
                warn!(error = %error, "shard listing unavailable");
                Ok(Section::error(METADATA, format!("{error:#}")))
            }
        }
    }
}

fn create_collector() -> Box<dyn Collector> {
    Box::new(DocsCollector)
}

register_collector!(create_collector);

/// Totals per rack across every primary shard; replicas would double count.
fn sum_primary_docs(shards: &[ShardRecord]) -> GroupTotals<u64> {
    let mut totals: GroupTotals<u64> = GroupTotals::new();

    for shard in shards.iter().filter(|shard| shard.is_primary()) {
        let Some(node) = shard.node.as_deref().filter(|node| !node.is_empty()) else {
            continue;
        };
        let Some(group) = GroupKey::from_node(node) else {
            continue;
        };

        let raw = shard.docs.as_deref().unwrap_or("0");
        let Ok(docs) = raw.trim().replace(',', "").parse::<u64>() else {
            debug!(node, raw, "skipping shard with unparsable doc count");
            continue;
        };

        let entry = totals.entry(group);
        *entry = entry.saturating_add(docs);
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_rows_are_excluded() {
        let shards = vec![
            ShardRecord::new("p", "RC10-1", "1,200"),
            ShardRecord::new("r", "RC10-2", "999"),
            ShardRecord::new("p", "RC12-1", "300"),
        ];
        let totals = sum_primary_docs(&shards);
        assert_eq!(totals.get(&GroupKey::new("RC10")), Some(&1200));
        assert_eq!(totals.get(&GroupKey::new("RC12")), Some(&300));
    }

    #[test]
    fn sums_across_nodes_without_averaging() {
        let shards = vec![
            ShardRecord::new("p", "RC17-1", "1,000,000"),
            ShardRecord::new("p", "RC17-2", "2,500"),
            ShardRecord::new("p", "RC17-2", "500"),
        ];
        let totals = sum_primary_docs(&shards);
        assert_eq!(totals.get(&GroupKey::new("RC17")), Some(&1_003_000));
    }

    #[test]
    fn lower_case_node_counts_toward_its_rack() {
        let shards = vec![
            ShardRecord::new("p", "RC10-1", "1,200"),
            ShardRecord::new("p", "rc10-2", "800"),
        ];
        let totals = sum_primary_docs(&shards);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals.get(&GroupKey::new("RC10")), Some(&2000));
    }

    #[test]
    fn unparsable_and_unassigned_rows_are_skipped() {
        let shards = vec![
            ShardRecord::new("p", "RC18-1", "n/a"),
            ShardRecord::new("p", "UNASSIGNED", "10"),
            ShardRecord {
                prirep: Some("p".to_string()),
                node: None,
                docs: Some("5".to_string()),
            },
            ShardRecord::new("p", "RC18-2", "7"),
        ];
        let totals = sum_primary_docs(&shards);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals.get(&GroupKey::new("RC18")), Some(&7));
    }

    #[test]
    fn output_lines_are_sorted_by_rack() {
        let shards = vec![
            ShardRecord::new("p", "RC12-1", "300"),
            ShardRecord::new("p", "RC10-1", "1,200"),
        ];
        let lines: Vec<String> = sum_primary_docs(&shards)
            .into_iter()
            .map(|(group, total)| Reading::DocCount { group, total }.to_string())
            .collect();
        assert_eq!(
            lines,
            vec![
                "RC10 총 문서 수 (Primary Shard 기준): 1,200".to_string(),
                "RC12 총 문서 수 (Primary Shard 기준): 300".to_string(),
            ]
        );
    }
}
