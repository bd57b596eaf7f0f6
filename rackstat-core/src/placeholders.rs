use chrono::{Datelike, NaiveDate};
use rackstat_deck::{DATE_KEY, PlaceholderMap};
use rackstat_sdk::Section;
use tracing::debug;

/// `2026-10-07` → `10월 07일`.
pub fn date_value(date: NaiveDate) -> String {
    format!("{:02}월 {:02}일", date.month(), date.day())
}

/// Flattens collected sections into the lookup used by the template renderer.
///
/// Readings that carry no value (backend failures, unparsable samples) contribute nothing,
/// so their tokens stay visible in the rendered deck.
pub fn build_placeholders(sections: &[Section], date: NaiveDate) -> PlaceholderMap {
    let mut map = PlaceholderMap::new();
    map.insert(DATE_KEY, date_value(date));

    for section in sections {
        for reading in &section.readings {
            let Some((key, value)) = reading.placeholder() else {
                debug!(section = section.id, line = %reading, "reading has no placeholder value");
                continue;
            };
            if let Some(previous) = map.insert(&key, value) {
                debug!(key, previous, "placeholder overwritten");
            }
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackstat_sdk::{CollectorMetadata, GroupKey, MetricFamily, Reading};

    const CAPACITY: CollectorMetadata = CollectorMetadata {
        id: "capacity",
        title: "HDD 평균 사용량",
        family: MetricFamily::Capacity,
        order: 10,
    };

    const MEMORY: CollectorMetadata = CollectorMetadata {
        id: "memory",
        title: "Memory 평균 사용량",
        family: MetricFamily::Memory,
        order: 30,
    };

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 5).expect("valid date")
    }

    #[test]
    fn date_is_zero_padded() {
        assert_eq!(date_value(date()), "03월 05일");
    }

    #[test]
    fn keys_are_group_and_family() {
        let capacity = Section::from_readings(
            CAPACITY,
            vec![Reading::Capacity {
                group: GroupKey::new("RC10"),
                avg_used_gb: 876,
                avg_total_gb: 1741,
                percent: 50,
            }],
        );
        let memory = Section::from_readings(
            MEMORY,
            vec![
                Reading::Utilization {
                    family: MetricFamily::Memory,
                    group: GroupKey::new("RC10"),
                    percent: 66,
                },
                Reading::NoResult {
                    family: MetricFamily::Memory,
                    group: GroupKey::new("RC17"),
                },
            ],
        );

        let map = build_placeholders(&[capacity, memory], date());
        assert_eq!(map.get("date"), Some("03월 05일"));
        assert_eq!(map.get("rc10_hdd"), Some("876GB/1741GB (50%)"));
        assert_eq!(map.get("rc10_memory"), Some("66%"));
        assert_eq!(map.get("rc17_memory"), Some("결과 없음"));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn failed_readings_leave_no_value() {
        let memory = Section::from_readings(
            MEMORY,
            vec![
                Reading::HttpStatus {
                    family: MetricFamily::Memory,
                    group: GroupKey::new("RC12"),
                    status: 500,
                },
                Reading::Transport {
                    family: MetricFamily::Memory,
                    group: GroupKey::new("RC18"),
                    detail: "timed out".to_string(),
                },
            ],
        );

        let map = build_placeholders(&[memory], date());
        assert!(!map.contains_key("rc12_memory"));
        assert!(!map.contains_key("rc18_memory"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn later_reading_for_same_key_wins() {
        let memory = Section::from_readings(
            MEMORY,
            vec![
                Reading::Utilization {
                    family: MetricFamily::Memory,
                    group: GroupKey::new("RC10"),
                    percent: 40,
                },
                Reading::Utilization {
                    family: MetricFamily::Memory,
                    group: GroupKey::new("RC10"),
                    percent: 41,
                },
            ],
        );

        let map = build_placeholders(&[memory], date());
        assert_eq!(map.get("rc10_memory"), Some("41%"));
    }
}
