use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use askama::Template;
use chrono::{Datelike, NaiveDate};
use rackstat_deck::{
    DECK_EXTENSION, PlaceholderMap, Presentation, RenderOutcome, RunStyle, Shape, Slide,
    TemplateRenderer, TextFrame,
};
use rackstat_sdk::MetricFamily;
use tracing::{debug, error, info, warn};

use crate::{Report, build_placeholders, date_value};

pub const DEFAULT_LABEL: &str = "RnD_월간보고";
pub const DEFAULT_TITLE: &str = "클러스터 시스템 운영 현황";
pub const SUMMARY_TITLE: &str = "시스템 현황 요약";
pub const SUMMARY_FONT: &str = "맑은 고딕";
pub const SUMMARY_FONT_SIZE_PT: f32 = 12.0;

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Output name prefix, also the template's stem.
    pub label: String,
    /// Heading of the fallback title slide.
    pub title: String,
    pub template: PathBuf,
    pub output_dir: PathBuf,
    /// File name used by the fallback branch instead of the dated default.
    pub output_override: Option<String>,
    pub report_date: NaiveDate,
}

impl AssembleOptions {
    /// Defaults rooted at `base`: template under `base/template`, output in `base`.
    pub fn new<P: AsRef<Path>>(base: P, report_date: NaiveDate) -> Self {
        let base = base.as_ref();
        Self {
            label: DEFAULT_LABEL.to_string(),
            title: DEFAULT_TITLE.to_string(),
            template: default_template_path(base, DEFAULT_LABEL),
            output_dir: base.to_path_buf(),
            output_override: None,
            report_date,
        }
    }
}

pub fn default_template_path(base: &Path, label: &str) -> PathBuf {
    base.join("template")
        .join(format!("{label}_기본템플릿.{DECK_EXTENSION}"))
}

/// `RnD_월간보고_2026년_10월_현황.json`
pub fn dated_filename(label: &str, date: NaiveDate) -> String {
    format!(
        "{label}_{}년_{:02}월_현황.{DECK_EXTENSION}",
        date.year(),
        date.month()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Template,
    Fallback,
}

/// What the assembler did: the branch taken, the written file, and lines for the operator.
#[derive(Debug)]
pub struct Assembly {
    pub branch: Branch,
    pub output: Option<PathBuf>,
    pub notes: Vec<String>,
}

impl Assembly {
    pub fn written(&self) -> bool {
        self.output.is_some()
    }
}

/// Writes the monthly deck, from the template if one exists, else from scratch.
///
/// A failed template branch produces no document; it never falls back.
pub fn assemble(report: &Report, options: &AssembleOptions) -> Assembly {
    if options.template.is_file() {
        info!(template = %options.template.display(), "filling template");
        template_branch(report, options)
    } else {
        info!(
            template = %options.template.display(),
            "template not found, building default deck"
        );
        fallback_branch(report, options)
    }
}

fn template_branch(report: &Report, options: &AssembleOptions) -> Assembly {
    let placeholders = build_placeholders(&report.sections, report.metadata.report_date);
    info!(keys = placeholders.len(), "placeholders resolved");
    debug!(?placeholders, "placeholder values");

    let mut notes = Vec::new();
    let output = match render_template(options, &placeholders) {
        Ok((path, outcome)) => {
            for diagnostic in &outcome.diagnostics {
                warn!(%diagnostic, "unresolved placeholder");
                notes.push(diagnostic.to_string());
            }
            info!(
                path = %path.display(),
                substitutions = outcome.substitutions.len(),
                restyled = outcome.restyled,
                "template deck written"
            );
            Some(path)
        }
        Err(err) => {
            error!(error = ?err, "template deck not written");
            notes.push(format!("템플릿 업데이트 중 오류 발생: {err:#}"));
            None
        }
    };

    Assembly {
        branch: Branch::Template,
        output,
        notes,
    }
}

fn render_template(
    options: &AssembleOptions,
    placeholders: &PlaceholderMap,
) -> Result<(PathBuf, RenderOutcome)> {
    let mut deck = Presentation::open(&options.template)?;
    let outcome = TemplateRenderer::new(placeholders)
        .render(&mut deck)
        .with_context(|| format!("failed to render {}", options.template.display()))?;

    let path = options
        .output_dir
        .join(dated_filename(&options.label, options.report_date));
    deck.save(&path)?;
    Ok((path, outcome))
}

fn fallback_branch(report: &Report, options: &AssembleOptions) -> Assembly {
    let filename = options
        .output_override
        .clone()
        .unwrap_or_else(|| dated_filename(&options.label, options.report_date));
    let path = options.output_dir.join(filename);

    let written = build_fallback_deck(report, &options.title)
        .and_then(|deck| deck.save(&path).map_err(Into::into));

    let mut notes = Vec::new();
    let output = match written {
        Ok(()) => {
            info!(path = %path.display(), "default deck written");
            Some(path)
        }
        Err(err) => {
            error!(error = ?err, "default deck not written");
            notes.push(format!("보고서 파일 생성 중 오류 발생: {err:#}"));
            None
        }
    };

    Assembly {
        branch: Branch::Fallback,
        output,
        notes,
    }
}

struct SummaryBlock {
    heading: &'static str,
    lines: Vec<String>,
}

#[derive(Template)]
#[template(path = "summary.txt", escape = "none")]
struct SummaryText {
    date: String,
    blocks: Vec<SummaryBlock>,
}

fn heading(family: MetricFamily) -> &'static str {
    match family {
        MetricFamily::Capacity => "HDD 사용량:",
        MetricFamily::Cpu => "CPU 사용량:",
        MetricFamily::Memory => "Memory 사용량:",
        MetricFamily::Documents => "문서 수:",
    }
}

/// Summary body: a dated header, then every collected line per family, diagnostics included.
pub fn summary_text(report: &Report) -> Result<String> {
    let blocks = [
        MetricFamily::Capacity,
        MetricFamily::Cpu,
        MetricFamily::Memory,
        MetricFamily::Documents,
    ]
    .into_iter()
    .map(|family| SummaryBlock {
        heading: heading(family),
        lines: report.lines(family),
    })
    .collect();

    let text = SummaryText {
        date: date_value(report.metadata.report_date),
        blocks,
    }
    .render()?;
    Ok(text.trim_end().to_string())
}

/// Two slides: title and subtitle, then the summary text box.
pub fn build_fallback_deck(report: &Report, title: &str) -> Result<Presentation> {
    let date = report.metadata.report_date;
    let mut deck = Presentation::new();

    deck.add_slide(Slide::with_layout("title"))
        .push(Shape::text("title", TextFrame::from_text(title)))
        .push(Shape::text(
            "subtitle",
            TextFrame::from_text(&format!(
                "{}년 {:02}월 월간 보고서",
                date.year(),
                date.month()
            )),
        ));

    let mut summary = TextFrame::from_text(&summary_text(report)?);
    for run in summary.runs_mut() {
        run.style = RunStyle {
            font_name: Some(SUMMARY_FONT.to_string()),
            font_size_pt: Some(SUMMARY_FONT_SIZE_PT),
        };
    }

    deck.add_slide(Slide::with_layout("title_and_content"))
        .push(Shape::text("title", TextFrame::from_text(SUMMARY_TITLE)))
        .push(Shape::text("summary", summary));

    Ok(deck)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;
    use std::sync::{Arc, Mutex};

    use rackstat_deck::{Alignment, Table};
    use tempfile::tempdir;

    use super::*;
    use crate::collect_report;
    use crate::fixtures::{FixtureSource, date, groups};
    use rackstat_sdk::CollectionContext;
    use tracing_subscriber::fmt::MakeWriter;

    use mod_capacity as _;
    use mod_cpu as _;
    use mod_docs as _;
    use mod_memory as _;

    fn report(source: &FixtureSource) -> Report {
        let ctx = CollectionContext::new(source, source).with_groups(groups());
        collect_report(&ctx, date())
    }

    fn write_template(path: &Path) {
        let mut deck = Presentation::new();
        deck.add_slide(Slide::default())
            .push(Shape::text("date", TextFrame::from_text("{date}")))
            .push(Shape::text(
                "capacity",
                TextFrame::from_text("RC10 {rc10_hdd} / RC12 {rc12_hdd}"),
            ))
            .push(Shape::table(
                "docs",
                Table::from_rows(&[
                    &["rack", "docs", "memory"],
                    &["RC10", "{rc10_docs}", "{rc10_memory}"],
                    &["RC12", "{rc12_docs}", "{rc12_memory}"],
                ]),
            ));
        deck.save(path).expect("write template");
    }

    #[test]
    fn filename_carries_year_and_padded_month() {
        assert_eq!(
            dated_filename("RnD_월간보고", date()),
            "RnD_월간보고_2026년_10월_현황.json"
        );
        let march = NaiveDate::from_ymd_opt(2027, 3, 1).expect("valid date");
        assert_eq!(dated_filename("x", march), "x_2027년_03월_현황.json");
    }

    #[test]
    fn default_template_sits_under_base() {
        let options = AssembleOptions::new("/opt/rackstat", date());
        assert_eq!(
            options.template,
            PathBuf::from("/opt/rackstat/template/RnD_월간보고_기본템플릿.json")
        );
        assert_eq!(options.output_dir, PathBuf::from("/opt/rackstat"));
    }

    #[test]
    fn template_branch_fills_tokens_and_reports_gaps() {
        let dir = tempdir().expect("tempdir");
        let options = AssembleOptions::new(dir.path(), date());
        fs::create_dir_all(options.template.parent().expect("parent")).expect("mkdir");
        write_template(&options.template);

        let assembly = assemble(&report(&FixtureSource::healthy()), &options);
        assert_eq!(assembly.branch, Branch::Template);
        let path = assembly.output.clone().expect("deck written");
        assert_eq!(path, dir.path().join("RnD_월간보고_2026년_10월_현황.json"));

        let deck = Presentation::open(&path).expect("reopen");
        let shapes = &deck.slides[0].shapes;

        let date_frame = shapes[0].text_frame().expect("date frame");
        assert_eq!(date_frame.text(), "10월 07일");
        assert_eq!(date_frame.paragraphs[0].alignment, Some(Alignment::Right));

        assert_eq!(
            shapes[1].text_frame().expect("capacity frame").text(),
            "RC10 500GB/1024GB (48%) / RC12 100GB/200GB (50%)"
        );

        let table = shapes[2].table_ref().expect("table");
        assert_eq!(table.cell(1, 1).expect("cell").text(), "1,200");
        assert_eq!(table.cell(2, 1).expect("cell").text(), "300");
        assert_eq!(table.cell(1, 2).expect("cell").text(), "66%");
        // RC12 memory answered 503, so its token is left for the operator to see.
        assert_eq!(table.cell(2, 2).expect("cell").text(), "{rc12_memory}");

        assert_eq!(assembly.notes.len(), 1);
        assert!(assembly.notes[0].ends_with("rc12_memory에 대한 데이터를 찾을 수 없습니다."));
    }

    #[test]
    fn ragged_template_writes_nothing_and_does_not_fall_back() {
        let dir = tempdir().expect("tempdir");
        let options = AssembleOptions::new(dir.path(), date());
        fs::create_dir_all(options.template.parent().expect("parent")).expect("mkdir");

        let mut table = Table::from_rows(&[&["{rc10_docs}", "x"], &["y", "z"]]);
        table.rows[1].pop();
        let mut deck = Presentation::new();
        deck.add_slide(Slide::default()).push(Shape::table("docs", table));
        deck.save(&options.template).expect("write template");

        let assembly = assemble(&report(&FixtureSource::healthy()), &options);
        assert_eq!(assembly.branch, Branch::Template);
        assert!(!assembly.written());
        assert_eq!(assembly.notes.len(), 1);
        assert!(!dir.path().join(dated_filename(DEFAULT_LABEL, date())).exists());
    }

    #[test]
    fn fallback_deck_carries_every_line_verbatim() {
        let dir = tempdir().expect("tempdir");
        let source = FixtureSource {
            shards: None,
            ..FixtureSource::healthy()
        };
        let mut options = AssembleOptions::new(dir.path(), date());
        options.output_override = Some("summary.json".to_string());

        let report = report(&source);
        let assembly = assemble(&report, &options);
        assert_eq!(assembly.branch, Branch::Fallback);
        assert_eq!(assembly.output, Some(dir.path().join("summary.json")));

        let deck = Presentation::open(dir.path().join("summary.json")).expect("reopen");
        assert_eq!(deck.slides.len(), 2);
        assert_eq!(
            deck.slides[0].shapes[1].text_frame().expect("subtitle").text(),
            "2026년 10월 월간 보고서"
        );

        let body = deck.slides[1].shapes[1].text_frame().expect("summary");
        let text = body.text();
        assert!(text.starts_with("시스템 현황 (10월 07일)\n\nHDD 사용량:\n"));

        let mut heading_positions = Vec::new();
        for family in [
            MetricFamily::Capacity,
            MetricFamily::Cpu,
            MetricFamily::Memory,
            MetricFamily::Documents,
        ] {
            let block = heading(family);
            heading_positions.push(text.find(block).expect("family heading"));

            let lines = report.lines(family);
            assert!(!lines.is_empty(), "{block} has no lines");
            for line in lines {
                let indented = format!("  {line}");
                assert!(
                    text.lines().any(|l| l == indented),
                    "missing line {indented:?} in {text}"
                );
            }
        }
        assert!(heading_positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(text.lines().any(|l| l == "  RC12 → HTTP 오류 코드: 503"));
        assert!(text.lines().any(|l| l == "  예외 발생: shard listing unreachable"));

        let run = &body.paragraphs[0].runs[0];
        assert_eq!(run.style.font_name.as_deref(), Some(SUMMARY_FONT));
        assert_eq!(run.style.font_size_pt, Some(SUMMARY_FONT_SIZE_PT));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn resolved_placeholder_values_are_logged_at_debug() {
        let dir = tempdir().expect("tempdir");
        let options = AssembleOptions::new(dir.path(), date());
        fs::create_dir_all(options.template.parent().expect("parent")).expect("mkdir");
        write_template(&options.template);

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let assembly = tracing::subscriber::with_default(subscriber, || {
            assemble(&report(&FixtureSource::healthy()), &options)
        });
        assert!(assembly.written());

        let output = String::from_utf8(logs.0.lock().expect("log buffer").clone()).expect("utf8");
        assert!(output.contains("placeholder values"));
        assert!(output.contains("rc10_hdd"));
        assert!(output.contains("500GB/1024GB (48%)"));
        assert!(output.contains("10월 07일"));
    }

    #[test]
    fn override_is_ignored_when_template_exists() {
        let dir = tempdir().expect("tempdir");
        let mut options = AssembleOptions::new(dir.path(), date());
        options.output_override = Some("custom.json".to_string());
        fs::create_dir_all(options.template.parent().expect("parent")).expect("mkdir");
        write_template(&options.template);

        let assembly = assemble(&report(&FixtureSource::healthy()), &options);
        assert_eq!(
            assembly.output,
            Some(dir.path().join("RnD_월간보고_2026년_10월_현황.json"))
        );
        assert!(!dir.path().join("custom.json").exists());
    }
}
