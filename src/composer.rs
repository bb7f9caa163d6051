use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::device::DeviceParser;
use crate::filter::{evaluate, Verdict};
use crate::git::CommitDates;
use crate::models::{Device, Removable};
use crate::rank::{find_rank_ties, sort_ranked, top_n};
use crate::readme;
use crate::report::csv_sink::MultiSinkWriter;

/// Everything a run produced, for the terminal and JSON reports.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub wiki_devices: PathBuf,
    pub parsed: usize,
    pub failed: usize,
    pub kept: usize,
    /// Skip counts keyed by [`crate::filter::SkipReason::label`].
    pub skipped: BTreeMap<String, usize>,
    pub outputs: Vec<OutputFile>,
    pub top_all: Vec<TopEntry>,
    pub top_kept: Vec<TopEntry>,
    pub last_wiki_update: Option<String>,
    /// Lines written into the README section.
    pub summary: Vec<String>,
    pub readme: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct OutputFile {
    pub version: u32,
    pub path: Option<PathBuf>,
    pub rows: usize,
}

#[derive(Debug, Serialize)]
pub struct TopEntry {
    pub short_name: String,
    pub codename: String,
    pub maintainers: usize,
    pub removable_battery: Removable,
    pub wiki_link: String,
}

impl From<&Device> for TopEntry {
    fn from(device: &Device) -> Self {
        TopEntry {
            short_name: device.short_name.clone(),
            codename: device.codename.clone(),
            maintainers: device.maintainer_count,
            removable_battery: device.removable_battery(),
            wiki_link: device.wiki_link.clone(),
        }
    }
}

/// Runs the whole pipeline: load → top list → filter → CSV → README.
pub struct Composer<'a> {
    pub config: &'a Config,
    pub dates: &'a dyn CommitDates,
    pub today: NaiveDate,
    pub show_progress: bool,
}

impl<'a> Composer<'a> {
    pub fn run(&self) -> Result<RunReport> {
        let dir = &self.config.input.wiki_devices;
        if !dir.is_dir() {
            bail!("Wiki device directory not found: {}", dir.display());
        }
        info!(path = %dir.display(), "Generate csv on {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S+0000"));

        let (mut devices, failed) = self.load_devices(dir)?;
        sort_ranked(&mut devices);
        for (a, b) in find_rank_ties(&devices) {
            warn!(
                device = %a.short_name,
                "devices {} and {} share the same name, ranked by codename",
                a.codename,
                b.codename
            );
        }

        let top_count = self.config.readme.top_n;
        let top_all = top_n(&devices, top_count);
        let last_wiki_update = devices
            .iter()
            .map(|d| d.wiki_commit_date.as_str())
            .filter(|d| !d.is_empty())
            .max()
            .map(str::to_string);
        let summary = summary_lines(&top_all, last_wiki_update.as_deref(), self.today);

        let mut skipped: BTreeMap<String, usize> = BTreeMap::new();
        let mut kept: Vec<(&Device, BTreeSet<u32>)> = Vec::new();
        for device in &devices {
            match evaluate(&self.config.filter, device) {
                Verdict::Keep { buckets } => kept.push((device, buckets)),
                Verdict::Skip(reason) => {
                    info!(device = %device.short_name, "Skip: {}", reason);
                    *skipped.entry(reason.label().to_string()).or_insert(0) += 1;
                }
            }
        }

        let outputs = self.write_csv(&kept)?;

        let readme = if self.config.readme.enabled {
            let path = &self.config.readme.path;
            readme::patch_file(path, &self.config.readme.section_marker, &summary)?;
            info!(path = %path.display(), "README updated");
            Some(path.clone())
        } else {
            None
        };

        Ok(RunReport {
            wiki_devices: dir.clone(),
            parsed: devices.len(),
            failed,
            kept: kept.len(),
            skipped,
            outputs,
            top_all: top_all.into_iter().map(TopEntry::from).collect(),
            top_kept: top_n(kept.iter().map(|(d, _)| *d), top_count)
                .into_iter()
                .map(TopEntry::from)
                .collect(),
            last_wiki_update,
            summary,
            readme,
        })
    }

    /// Parse every descriptor in `dir`. Returns the devices and the number of failed files.
    fn load_devices(&self, dir: &Path) -> Result<(Vec<Device>, usize)> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
        {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .map_or(false, |ext| ext == "yml" || ext == "yaml");
            if path.is_file() && is_yaml {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "not a device descriptor");
            }
        }
        paths.sort();

        let pb = if self.show_progress {
            let pb = ProgressBar::new(paths.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let parser = DeviceParser::new()?;
        let mut devices = Vec::with_capacity(paths.len());
        let mut seen: HashSet<String> = HashSet::new();
        let mut failed = 0;

        for path in &paths {
            match self.load_device(&parser, path) {
                Ok(device) if !seen.insert(device.codename.clone()) => {
                    warn!(path = %path.display(), "duplicate codename {}, skipping", device.codename);
                    failed += 1;
                }
                Ok(device) => devices.push(device),
                Err(err) => {
                    warn!(path = %path.display(), "skipping descriptor: {:#}", err);
                    failed += 1;
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok((devices, failed))
    }

    fn load_device(&self, parser: &DeviceParser, path: &Path) -> Result<Device> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc: Value = serde_yaml::from_str(&content).context("Invalid YAML")?;
        let mut device = parser.parse(&doc, String::new())?;

        device.wiki_commit_date = match self.dates.commit_date(path) {
            Ok(date) => date,
            Err(err) => {
                warn!(device = %device.short_name, "no wiki commit date: {:#}", err);
                String::new()
            }
        };
        Ok(device)
    }

    /// Write `kept` (already in ranked order) into one table per configured version.
    fn write_csv(&self, kept: &[(&Device, BTreeSet<u32>)]) -> Result<Vec<OutputFile>> {
        let output = &self.config.output;
        let mut sinks = MultiSinkWriter::create(
            &output.csv_template,
            &self.config.filter.target_versions,
            output.columns.clone(),
        )
        .context("Cannot open CSV output")?;

        for (device, buckets) in kept {
            debug!(
                "{} {} - {}",
                device.vendor_short, device.name, device.wiki_link
            );
            for &bucket in buckets {
                sinks.add_device(bucket, device)?;
            }
        }

        let finished = sinks.finish().context("Cannot finish CSV output")?;
        Ok(finished
            .into_iter()
            .map(|f| {
                if let Some(path) = &f.path {
                    info!(path = %path.display(), rows = f.rows, "CSV file generated");
                }
                OutputFile {
                    version: f.bucket,
                    path: f.path,
                    rows: f.rows,
                }
            })
            .collect())
    }
}

/// README section body: the top list followed by the update dates.
pub fn summary_lines(top: &[&Device], last_wiki_update: Option<&str>, today: NaiveDate) -> Vec<String> {
    let mut lines = vec![String::new()];
    for device in top {
        lines.push(format!(
            "* [{}]({}) ({}, {} maintainers)",
            device.codename, device.wiki_link, device.short_name, device.maintainer_count
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "(Last wiki update: {})",
        last_wiki_update.unwrap_or("unknown")
    ));
    lines.push(format!("(Generated on {})", today.format("%Y-%m-%d")));
    lines.push(String::new());
    lines
}
