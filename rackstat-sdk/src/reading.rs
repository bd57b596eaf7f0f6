use std::fmt;

use serde::Serialize;

use crate::GroupKey;

/// Shown in place of a utilization value when the time-series query returned no rows.
pub const NO_RESULT_MARKER: &str = "결과 없음";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    Capacity,
    Cpu,
    Memory,
    Documents,
}

impl MetricFamily {
    /// Suffix of the placeholder keys this family fills (`rc10_hdd`, `rc10_cpu`, ...).
    pub fn placeholder_suffix(&self) -> &'static str {
        match self {
            MetricFamily::Capacity => "hdd",
            MetricFamily::Cpu => "cpu",
            MetricFamily::Memory => "memory",
            MetricFamily::Documents => "docs",
        }
    }

    pub fn placeholder_key(&self, group: &GroupKey) -> String {
        format!("{}_{}", group.placeholder_prefix(), self.placeholder_suffix())
    }
}

/// One aggregated value, or the diagnostic that replaced it.
///
/// `Display` renders the operator log line; [`Reading::placeholder`] renders the value
/// substituted into the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    Capacity {
        group: GroupKey,
        avg_used_gb: u64,
        avg_total_gb: u64,
        percent: u64,
    },
    Utilization {
        family: MetricFamily,
        group: GroupKey,
        percent: i64,
    },
    NoResult {
        family: MetricFamily,
        group: GroupKey,
    },
    Unparsable {
        family: MetricFamily,
        group: GroupKey,
        raw: String,
    },
    HttpStatus {
        family: MetricFamily,
        group: GroupKey,
        status: u16,
    },
    Transport {
        family: MetricFamily,
        group: GroupKey,
        detail: String,
    },
    DocCount {
        group: GroupKey,
        total: u64,
    },
}

impl Reading {
    pub fn group(&self) -> &GroupKey {
        match self {
            Reading::Capacity { group, .. }
            | Reading::Utilization { group, .. }
            | Reading::NoResult { group, .. }
            | Reading::Unparsable { group, .. }
            | Reading::HttpStatus { group, .. }
            | Reading::Transport { group, .. }
            | Reading::DocCount { group, .. } => group,
        }
    }

    pub fn family(&self) -> MetricFamily {
        match self {
            Reading::Capacity { .. } => MetricFamily::Capacity,
            Reading::DocCount { .. } => MetricFamily::Documents,
            Reading::Utilization { family, .. }
            | Reading::NoResult { family, .. }
            | Reading::Unparsable { family, .. }
            | Reading::HttpStatus { family, .. }
            | Reading::Transport { family, .. } => *family,
        }
    }

    /// True for readings that carry an actual measurement.
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Reading::Capacity { .. } | Reading::Utilization { .. } | Reading::DocCount { .. }
        )
    }

    /// Placeholder key and display value; `None` for backend and parse diagnostics.
    pub fn placeholder(&self) -> Option<(String, String)> {
        let value = match self {
            Reading::Capacity {
                avg_used_gb,
                avg_total_gb,
                percent,
                ..
            } => format!("{avg_used_gb}GB/{avg_total_gb}GB ({percent}%)"),
            Reading::Utilization { percent, .. } => format!("{percent}%"),
            Reading::NoResult { .. } => NO_RESULT_MARKER.to_string(),
            Reading::DocCount { total, .. } => format_thousands(*total),
            Reading::Unparsable { .. } | Reading::HttpStatus { .. } | Reading::Transport { .. } => {
                return None;
            }
        };
        Some((self.family().placeholder_key(self.group()), value))
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Capacity {
                group,
                avg_used_gb,
                avg_total_gb,
                percent,
            } => write!(f, "{group} {avg_used_gb}GB/{avg_total_gb}GB ({percent}%)"),
            Reading::Utilization { group, percent, .. } => {
                write!(f, "{{group=\"{group}\"}}  {percent}%")
            }
            Reading::NoResult { group, .. } => write!(f, "{group} {NO_RESULT_MARKER}"),
            Reading::Unparsable { group, raw, .. } => {
                write!(f, "{{group=\"{group}\"}}  변환 실패: {raw}")
            }
            Reading::HttpStatus { group, status, .. } => {
                write!(f, "{group} → HTTP 오류 코드: {status}")
            }
            Reading::Transport { group, detail, .. } => write!(f, "{group} → 예외 발생: {detail}"),
            Reading::DocCount { group, total } => write!(
                f,
                "{group} 총 문서 수 (Primary Shard 기준): {}",
                format_thousands(*total)
            ),
        }
    }
}

/// `2585773384` → `2,585,773,384`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
