use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "lineageos-info",
    about = "Generate device CSV reports and a README top list from the LineageOS wiki",
    version
)]
pub struct Cli {
    /// Directory with the wiki device descriptors [default: lineage_wiki/_data/devices]
    pub wiki_devices: Option<PathBuf>,

    /// Config file [default: ./.lineageos-info/config.toml, fallback ~/.config/lineageos-info/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write a CSV file for this LineageOS version (repeatable, replaces the configured set)
    #[arg(long = "target-version", value_name = "VERSION")]
    pub target_versions: Vec<u32>,

    /// Skip devices with fewer maintainers
    #[arg(long, value_name = "N")]
    pub min_maintainers: Option<usize>,

    /// CSV output template; `{version}` is replaced by the version number
    #[arg(long, value_name = "TEMPLATE")]
    pub output: Option<String>,

    /// README file whose top list section is regenerated
    #[arg(long, value_name = "FILE")]
    pub readme: Option<PathBuf>,

    /// Do not touch the README
    #[arg(long)]
    pub no_readme: bool,

    /// Do not ask git for the wiki commit dates
    #[arg(long)]
    pub no_git: bool,

    /// Log file [default: device_info.log]
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,

    /// Show debug logs and the top list of the CSV devices
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

impl Cli {
    /// Command line flags take precedence over the config file.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(path) = &self.wiki_devices {
            config.input.wiki_devices = path.clone();
        }
        if !self.target_versions.is_empty() {
            config.filter.target_versions = self.target_versions.iter().copied().collect();
        }
        if let Some(min) = self.min_maintainers {
            config.filter.min_maintainers = min;
        }
        if let Some(template) = &self.output {
            config.output.csv_template = template.clone();
        }
        if let Some(readme) = &self.readme {
            config.readme.path = readme.clone();
        }
        if self.no_readme {
            config.readme.enabled = false;
        }
        if self.no_git {
            config.input.git_dates = false;
        }
        if let Some(log_file) = &self.log_file {
            config.log.file = log_file.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "lineageos-info",
            "wiki/devices",
            "--target-version",
            "18",
            "--target-version",
            "19",
            "--min-maintainers",
            "2",
            "--no-readme",
            "--no-git",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.input.wiki_devices, PathBuf::from("wiki/devices"));
        assert_eq!(config.filter.target_versions, BTreeSet::from([18, 19]));
        assert_eq!(config.filter.min_maintainers, 2);
        assert!(!config.readme.enabled);
        assert!(!config.input.git_dates);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["lineageos-info"]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert_eq!(config.filter.target_versions, BTreeSet::from([16, 17]));
        assert!(config.readme.enabled);
        assert!(matches!(cli.report, ReportFormat::Terminal));
    }
}
