use anyhow::Result;
use chrono::{Local, NaiveDate};
use rackstat_sdk::{CollectionContext, MetricFamily, Reading, Section};
use tracing::{info, warn};

mod assemble;
mod placeholders;

pub use assemble::{
    AssembleOptions, Assembly, Branch, DEFAULT_LABEL, DEFAULT_TITLE, assemble, build_fallback_deck,
    dated_filename, default_template_path, summary_text,
};
pub use placeholders::{build_placeholders, date_value};
pub use rackstat_sdk::{CollectionContext as Context, GroupSpec, SectionStatus};

#[derive(Debug)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub report_date: NaiveDate,
    pub sections: usize,
}

/// Everything one run collected, in collection order.
#[derive(Debug)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn new(report_date: NaiveDate, sections: Vec<Section>) -> Self {
        let count = sections.len();
        Self {
            metadata: ReportMetadata {
                generated_at: Local::now().to_rfc3339(),
                report_date,
                sections: count,
            },
            sections,
        }
    }

    pub fn section(&self, family: MetricFamily) -> Option<&Section> {
        self.sections.iter().find(|section| section.family == family)
    }

    /// Operator lines of one family; empty if the family was not collected.
    pub fn lines(&self, family: MetricFamily) -> Vec<String> {
        self.section(family).map(Section::lines).unwrap_or_default()
    }

    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.sections.iter().flat_map(|section| section.readings.iter())
    }

    /// Lines that stand in for a value that could not be obtained.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .readings()
            .filter(|reading| !reading.is_value())
            .map(ToString::to_string)
            .collect();
        for section in &self.sections {
            if section.status == SectionStatus::Error {
                lines.extend(section.lines());
            }
        }
        lines
    }

    pub fn to_markdown(&self) -> Result<String> {
        render::render_markdown(self).map_err(Into::into)
    }
}

fn collect_sections(ctx: &CollectionContext<'_>) -> Vec<Section> {
    let mut sections = Vec::new();

    for collector in rackstat_sdk::ordered_collectors() {
        let metadata = collector.metadata();
        info!(collector = metadata.id, "collecting");

        match collector.collect(ctx) {
            Ok(section) => sections.push(section),
            Err(error) => {
                warn!(collector = metadata.id, error = %error, "collector failed");
                sections.push(Section::error(metadata, format!("{error:#}")));
            }
        }
    }

    sections
}

pub fn collect_report(ctx: &CollectionContext<'_>, report_date: NaiveDate) -> Report {
    Report::new(report_date, collect_sections(ctx))
}

/// One full run: collect every family, then write the deck.
pub fn generate(ctx: &CollectionContext<'_>, options: &AssembleOptions) -> (Report, Assembly) {
    let report = collect_report(ctx, options.report_date);
    let assembly = assemble(&report, options);
    (report, assembly)
}

mod render {
    use askama::Template;

    use super::Report;

    #[derive(Template)]
    #[template(path = "report.md", escape = "none")]
    struct MarkdownReport<'a> {
        report: &'a Report,
    }

    pub fn render_markdown(report: &Report) -> askama::Result<String> {
        MarkdownReport { report }.render()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{FixtureSource, date, groups};
    use super::*;

    // Link modules so their collectors register during tests.
    use mod_capacity as _;
    use mod_cpu as _;
    use mod_docs as _;
    use mod_memory as _;

    #[test]
    fn families_are_collected_in_run_order() {
        let source = FixtureSource::healthy();
        let ctx = Context::new(&source, &source).with_groups(groups());
        let report = collect_report(&ctx, date());

        let order: Vec<&str> = report.sections.iter().map(|s| s.id).collect();
        assert_eq!(order, vec!["capacity", "cpu", "memory", "docs"]);
        assert_eq!(report.metadata.sections, 4);
    }

    #[test]
    fn lines_follow_operator_formats() {
        let source = FixtureSource::healthy();
        let ctx = Context::new(&source, &source).with_groups(groups());
        let report = collect_report(&ctx, date());

        assert_eq!(
            report.lines(MetricFamily::Capacity),
            vec!["RC10 500GB/1024GB (48%)", "RC12 100GB/200GB (50%)"]
        );
        assert_eq!(
            report.lines(MetricFamily::Cpu),
            vec![r#"{group="RC10"}  2%"#, r#"{group="RC12"}  8%"#]
        );
        assert_eq!(
            report.lines(MetricFamily::Memory),
            vec![r#"{group="RC10"}  66%"#, "RC12 → HTTP 오류 코드: 503"]
        );
        assert_eq!(
            report.lines(MetricFamily::Documents),
            vec![
                "RC10 총 문서 수 (Primary Shard 기준): 1,200",
                "RC12 총 문서 수 (Primary Shard 기준): 300",
            ]
        );
        assert_eq!(report.diagnostics(), vec!["RC12 → HTTP 오류 코드: 503"]);
    }

    #[test]
    fn unreachable_listing_does_not_stop_other_families() {
        let source = FixtureSource {
            allocation: None,
            ..FixtureSource::healthy()
        };
        let ctx = Context::new(&source, &source).with_groups(groups());
        let report = collect_report(&ctx, date());

        let capacity = report.section(MetricFamily::Capacity).expect("capacity");
        assert_eq!(capacity.status, SectionStatus::Error);
        assert_eq!(
            report.lines(MetricFamily::Capacity),
            vec!["예외 발생: allocation listing unreachable"]
        );
        assert_eq!(report.lines(MetricFamily::Documents).len(), 2);
        assert!(
            report
                .diagnostics()
                .contains(&"예외 발생: allocation listing unreachable".to_string())
        );
    }

    #[test]
    fn markdown_log_lists_every_line() {
        let source = FixtureSource::healthy();
        let ctx = Context::new(&source, &source).with_groups(groups());
        let report = collect_report(&ctx, date());
        let md = report.to_markdown().expect("markdown render");

        assert!(md.contains("## [HDD 평균 사용량] (success)"));
        assert!(md.contains("## [Memory 평균 사용량] (degraded)"));
        assert!(md.contains("- RC12 → HTTP 오류 코드: 503"));
        assert!(md.contains("- 변환 실패: RC10-2, 에러: invalid size value `GB-invalid`"));
    }
}
