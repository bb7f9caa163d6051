use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::filter::FilterPolicy;
use crate::report::csv_sink::{Column, VERSION_PLACEHOLDER};

/// Root configuration structure, deserialized from `.lineageos-info/config.toml`.
///
/// Every section and key is optional; missing values fall back to [`Config::default`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub filter: FilterPolicy,
    pub output: OutputConfig,
    pub readme: ReadmeConfig,
    pub log: LogFileConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Device descriptors of the wiki checkout.
    pub wiki_devices: PathBuf,
    /// Look up the last commit date of every descriptor with `git log`.
    pub git_dates: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            wiki_devices: PathBuf::from("lineage_wiki/_data/devices"),
            git_dates: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output path per version; `{version}` is replaced by the version number.
    pub csv_template: String,
    pub columns: Vec<Column>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            csv_template: format!("csv/lineageos_{}.csv", VERSION_PLACEHOLDER),
            columns: Column::default_set(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReadmeConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// Heading line whose section body is regenerated.
    pub section_marker: String,
    pub top_n: usize,
}

impl Default for ReadmeConfig {
    fn default() -> Self {
        ReadmeConfig {
            enabled: true,
            path: PathBuf::from("README.md"),
            section_marker: "## Top 10".to_string(),
            top_n: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogFileConfig {
    /// Log file, truncated on every run. An empty path disables it.
    pub file: PathBuf,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        LogFileConfig {
            file: PathBuf::from("device_info.log"),
        }
    }
}

impl LogFileConfig {
    pub fn path(&self) -> Option<&Path> {
        if self.file.as_os_str().is_empty() {
            None
        } else {
            Some(&self.file)
        }
    }
}

impl Config {
    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.filter.target_versions.is_empty() {
            bail!("No target versions configured");
        }
        if self.filter.target_versions.len() > 1
            && !self.output.csv_template.contains(VERSION_PLACEHOLDER)
        {
            bail!(
                "Output template `{}` must contain {} when several versions are configured",
                self.output.csv_template,
                VERSION_PLACEHOLDER
            );
        }
        if self.output.columns.is_empty() {
            bail!("No CSV columns configured");
        }
        if self.readme.enabled && self.readme.top_n == 0 {
            bail!("readme.top_n must be at least 1");
        }
        Ok(())
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<base>/.lineageos-info/config.toml`
/// 3. `~/.config/lineageos-info/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(base: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = base.join(".lineageos-info").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("lineageos-info")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}
