use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use chrono::Local;
use clap::Parser;
use rackstat_client::{ElasticClient, PrometheusClient};
use rackstat_core::{Branch, Context, generate};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

mod config;

use config::Config;

// Ensure collector modules are linked so they register.
use mod_capacity as _;
use mod_cpu as _;
use mod_docs as _;
use mod_memory as _;

#[derive(Parser, Debug)]
#[command(
    name = "rackstat",
    version,
    about = "Monthly rack cluster status report"
)]
struct Cli {
    /// File name for the generated deck when no template is present
    output: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let base = base_dir();

    let config = Config::load(&base);
    init_logging(config.as_ref().map_or("info", |config| config.log_level.as_str()));

    let outcome = config.and_then(|config| run(cli, base, &config));
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = ?err, "run aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, base: PathBuf, config: &Config) -> Result<bool> {
    let listing = ElasticClient::new(&config.elasticsearch).context("elasticsearch client")?;
    let series = PrometheusClient::new(&config.prometheus).context("prometheus client")?;
    let ctx = Context::new(&listing, &series)
        .with_groups(config.group_specs())
        .with_job(config.prometheus.job.clone());

    let today = Local::now().date_naive();
    let options = config.assemble_options(&base, today, cli.output);
    info!(base = %base.display(), date = %today, "starting monthly report");

    let (report, assembly) = generate(&ctx, &options);
    println!("{}", report.to_markdown()?);
    for note in &assembly.notes {
        println!("{note}");
    }

    match &assembly.output {
        Some(path) => {
            let message = match assembly.branch {
                Branch::Template => "템플릿 기반 보고서 생성 완료",
                Branch::Fallback => "기본 보고서 생성 완료",
            };
            println!("{message}: {}", path.display());
        }
        None => println!("보고서 생성 실패"),
    }

    Ok(assembly.written())
}

/// Directory holding the executable; falls back to the working directory.
fn base_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn init_logging(level: &str) {
    fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
