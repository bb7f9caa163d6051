use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::models::Device;

/// Placeholder replaced by the bucket's version in output file templates.
pub const VERSION_PLACEHOLDER: &str = "{version}";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no output table open for version {0}")]
    UnknownBucket(u32),
    #[error("cannot create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("template `{template}` writes several versions to {}", .path.display())]
    PathCollision { template: String, path: PathBuf },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One CSV column. The configured list decides which columns appear and in which order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Vendor,
    Name,
    Release,
    Screen,
    Ram,
    Storage,
    RemovableBattery,
    Maintainers,
    Codename,
    Models,
    Soc,
    Versions,
    /// The version of the file the row is written to.
    Bucket,
    WikiDate,
    WikiLink,
}

impl Column {
    pub fn default_set() -> Vec<Column> {
        vec![
            Column::Vendor,
            Column::Name,
            Column::Release,
            Column::Screen,
            Column::Ram,
            Column::Storage,
            Column::RemovableBattery,
            Column::Maintainers,
            Column::Codename,
            Column::Models,
            Column::Soc,
            Column::Versions,
            Column::WikiDate,
            Column::WikiLink,
        ]
    }

    pub fn header(self) -> &'static str {
        match self {
            Column::Vendor => "vendor",
            Column::Name => "name",
            Column::Release => "release",
            Column::Screen => "screen",
            Column::Ram => "RAM",
            Column::Storage => "storage",
            Column::RemovableBattery => "removable battery",
            Column::Maintainers => "maintainers",
            Column::Codename => "codename",
            Column::Models => "models",
            Column::Soc => "SOC",
            Column::Versions => "versions",
            Column::Bucket => "LineageOS version",
            Column::WikiDate => "wiki date",
            Column::WikiLink => "Wiki Link",
        }
    }

    pub fn value(self, device: &Device, bucket: u32) -> String {
        match self {
            Column::Vendor => device.vendor_short.clone(),
            Column::Name => device.name.clone(),
            Column::Release => device.release.clone(),
            Column::Screen => device.screen.clone().unwrap_or_default(),
            Column::Ram => device.ram.clone(),
            Column::Storage => device.storage.clone(),
            Column::RemovableBattery => device.battery.to_string(),
            Column::Maintainers => device.maintainer_count.to_string(),
            Column::Codename => device.codename.clone(),
            Column::Models => device.models.join(","),
            Column::Soc => device.soc.clone(),
            Column::Versions => device.version_labels.join("/"),
            Column::Bucket => bucket.to_string(),
            Column::WikiDate => device.wiki_commit_date.clone(),
            Column::WikiLink => device.wiki_link.clone(),
        }
    }
}

/// Output file for `bucket` according to `template`.
pub fn bucket_path(template: &str, bucket: u32) -> PathBuf {
    PathBuf::from(template.replace(VERSION_PLACEHOLDER, &bucket.to_string()))
}

struct Sink<W: Write> {
    writer: csv::Writer<W>,
    path: Option<PathBuf>,
    rows: usize,
}

/// A closed output table.
#[derive(Debug)]
pub struct FinishedSink<W> {
    pub bucket: u32,
    pub path: Option<PathBuf>,
    pub rows: usize,
    pub inner: W,
}

/// One CSV table per bucket, all sharing the same columns.
///
/// All tables are opened (and get their header row) up front. [`finish`]
/// flushes and closes them; tables dropped on an error path are flushed by
/// `csv::Writer`'s own `Drop`.
///
/// [`finish`]: MultiSinkWriter::finish
pub struct MultiSinkWriter<W: Write> {
    columns: Vec<Column>,
    sinks: BTreeMap<u32, Sink<W>>,
}

impl MultiSinkWriter<File> {
    /// Create one file per bucket from `template`, creating parent directories as needed.
    pub fn create(
        template: &str,
        buckets: &BTreeSet<u32>,
        columns: Vec<Column>,
    ) -> Result<Self, SinkError> {
        let mut paths: BTreeMap<u32, PathBuf> = BTreeMap::new();
        for &bucket in buckets {
            let path = bucket_path(template, bucket);
            if paths.values().any(|p| *p == path) {
                return Err(SinkError::PathCollision {
                    template: template.to_string(),
                    path,
                });
            }
            paths.insert(bucket, path);
        }

        let mut writers = BTreeMap::new();
        for (bucket, path) in paths {
            let file = create_file(&path).map_err(|source| SinkError::Create {
                path: path.clone(),
                source,
            })?;
            writers.insert(bucket, (file, Some(path)));
        }
        Self::open(writers, columns)
    }
}

fn create_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    File::create(path)
}

impl<W: Write> MultiSinkWriter<W> {
    /// Wrap already opened writers, one per bucket.
    pub fn from_writers(writers: BTreeMap<u32, W>, columns: Vec<Column>) -> Result<Self, SinkError> {
        let writers = writers.into_iter().map(|(b, w)| (b, (w, None))).collect();
        Self::open(writers, columns)
    }

    fn open(
        writers: BTreeMap<u32, (W, Option<PathBuf>)>,
        columns: Vec<Column>,
    ) -> Result<Self, SinkError> {
        let mut sinks = BTreeMap::new();
        for (bucket, (inner, path)) in writers {
            let mut writer = csv::Writer::from_writer(inner);
            writer.write_record(columns.iter().map(|c| c.header()))?;
            sinks.insert(bucket, Sink { writer, path, rows: 0 });
        }
        Ok(Self { columns, sinks })
    }

    /// Append `device` as one row of the `bucket` table.
    pub fn add_device(&mut self, bucket: u32, device: &Device) -> Result<(), SinkError> {
        let sink = self
            .sinks
            .get_mut(&bucket)
            .ok_or(SinkError::UnknownBucket(bucket))?;
        let row: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.value(device, bucket))
            .collect();
        sink.writer.write_record(&row)?;
        sink.rows += 1;
        Ok(())
    }

    /// Flush and close every table.
    pub fn finish(self) -> Result<Vec<FinishedSink<W>>, SinkError> {
        let mut finished = Vec::with_capacity(self.sinks.len());
        for (bucket, sink) in self.sinks {
            let inner = sink
                .writer
                .into_inner()
                .map_err(|e| SinkError::Io(e.into_error()))?;
            finished.push(FinishedSink {
                bucket,
                path: sink.path,
                rows: sink.rows,
                inner,
            });
        }
        Ok(finished)
    }
}
