use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use rackstat_client::{ElasticSettings, PrometheusSettings};
use rackstat_core::{AssembleOptions, DEFAULT_LABEL, DEFAULT_TITLE, GroupSpec, default_template_path};
use serde::Deserialize;

/// Looked up in the base directory; every key is optional.
pub const CONFIG_FILE: &str = "rackstat.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub label: String,
    pub title: String,
    /// Relative paths resolve against the base directory.
    pub template: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// `tracing` filter directive, e.g. `info` or `rackstat_core=debug`.
    pub log_level: String,
    pub elasticsearch: ElasticSettings,
    pub prometheus: PrometheusSettings,
    pub groups: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            title: DEFAULT_TITLE.to_string(),
            template: None,
            output_dir: None,
            log_level: "info".to_string(),
            elasticsearch: ElasticSettings::default(),
            prometheus: PrometheusSettings::default(),
            groups: ["RC10", "RC12", "RC17", "RC18"].map(String::from).to_vec(),
        }
    }
}

impl Config {
    /// Reads `<base>/rackstat.toml`, or returns the defaults when it does not exist.
    pub fn load(base: &Path) -> Result<Self> {
        let path = base.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid configuration in {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(Into::into)
    }

    pub fn group_specs(&self) -> Vec<GroupSpec> {
        self.groups.iter().map(GroupSpec::new).collect()
    }

    pub fn assemble_options(
        &self,
        base: &Path,
        report_date: NaiveDate,
        output_override: Option<String>,
    ) -> AssembleOptions {
        let resolve = |path: &PathBuf| base.join(path);
        AssembleOptions {
            label: self.label.clone(),
            title: self.title.clone(),
            template: self
                .template
                .as_ref()
                .map(resolve)
                .unwrap_or_else(|| default_template_path(base, &self.label)),
            output_dir: self
                .output_dir
                .as_ref()
                .map(resolve)
                .unwrap_or_else(|| base.to_path_buf()),
            output_override,
            report_date,
        }
    }
}
