use std::collections::BTreeSet;

use serde::Deserialize;

use crate::models::Device;

/// Which devices make it into the CSV files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    /// One CSV bucket per version.
    pub target_versions: BTreeSet<u32>,
    pub excluded_ram: BTreeSet<String>,
    pub excluded_storage: BTreeSet<String>,
    pub min_maintainers: usize,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy {
            target_versions: BTreeSet::from([16, 17]),
            excluded_ram: ["1 GB", "2 GB"].iter().map(|s| s.to_string()).collect(),
            excluded_storage: ["8 GB", "16 GB"].iter().map(|s| s.to_string()).collect(),
            min_maintainers: 1,
        }
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep { buckets: BTreeSet<u32> },
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    TooFewMaintainers { count: usize },
    NoTargetVersion { versions: Vec<String> },
    ExcludedRam(String),
    ExcludedStorage(String),
}

impl SkipReason {
    /// Short label used to group skip counts in reports.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::TooFewMaintainers { .. } => "maintainers",
            SkipReason::NoTargetVersion { .. } => "version",
            SkipReason::ExcludedRam(_) => "RAM",
            SkipReason::ExcludedStorage(_) => "storage",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TooFewMaintainers { count: 0 } => write!(f, "no maintainers"),
            SkipReason::TooFewMaintainers { count } => write!(f, "only {} maintainers", count),
            SkipReason::NoTargetVersion { versions } => write!(f, "only: {}", versions.join(", ")),
            SkipReason::ExcludedRam(ram) => write!(f, "RAM only: {}", ram),
            SkipReason::ExcludedStorage(storage) => write!(f, "storage only: {}", storage),
        }
    }
}

/// Decide whether `device` is kept and for which buckets.
///
/// Rules are checked in order, the first failing one wins:
/// maintainers, target versions, RAM, storage.
pub fn evaluate(policy: &FilterPolicy, device: &Device) -> Verdict {
    // A device nobody maintains is never listed, whatever the configuration says.
    let min_maintainers = policy.min_maintainers.max(1);
    if device.maintainer_count < min_maintainers {
        return Verdict::Skip(SkipReason::TooFewMaintainers {
            count: device.maintainer_count,
        });
    }

    let buckets: BTreeSet<u32> = policy
        .target_versions
        .intersection(&device.supported_versions)
        .copied()
        .collect();
    if buckets.is_empty() {
        return Verdict::Skip(SkipReason::NoTargetVersion {
            versions: device.version_labels.clone(),
        });
    }

    if policy.excluded_ram.contains(&device.ram) {
        return Verdict::Skip(SkipReason::ExcludedRam(device.ram.clone()));
    }

    if policy.excluded_storage.contains(&device.storage) {
        return Verdict::Skip(SkipReason::ExcludedStorage(device.storage.clone()));
    }

    Verdict::Keep { buckets }
}
