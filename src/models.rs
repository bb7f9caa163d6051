use std::collections::BTreeSet;

use serde::Serialize;

/// Base URL of the per-device wiki pages.
pub const WIKI_DEVICE_URL: &str = "https://wiki.lineageos.org/devices/";

/// One normalized device descriptor.
#[derive(Debug, Clone)]
pub struct Device {
    pub codename: String,
    pub vendor_short: String,
    pub name: String,
    pub short_name: String,
    pub maintainer_count: usize,
    pub supported_versions: BTreeSet<u32>,
    pub version_labels: Vec<String>,
    pub ram: String,
    pub storage: String,
    pub release: String,
    pub soc: String,
    pub screen: Option<String>,
    pub battery: Battery,
    pub models: Vec<String>,
    pub wiki_commit_date: String,
    pub wiki_link: String,
}

impl Device {
    /// The removable-battery tri-state.
    pub fn removable_battery(&self) -> Removable {
        self.battery.removable()
    }
}

/// Whether the battery can be swapped by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Removable {
    Yes,
    No,
    Unknown,
}

impl std::fmt::Display for Removable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Removable::Yes => write!(f, "yes"),
            Removable::No => write!(f, "no"),
            Removable::Unknown => write!(f, "unknown"),
        }
    }
}

/// Battery information of a single device variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryKind {
    /// `removable: true` / `removable: false`.
    Removable(bool),
    /// Battery entry present, but `removable` is missing or null.
    Unspecified,
    /// The wiki lists the battery as the literal string `None` (e.g. TV boxes).
    NoBattery,
}

impl std::fmt::Display for BatteryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatteryKind::Removable(true) => write!(f, "yes"),
            BatteryKind::Removable(false) => write!(f, "no"),
            BatteryKind::Unspecified | BatteryKind::NoBattery => write!(f, "-"),
        }
    }
}

/// Battery field of a descriptor, decoded once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Battery {
    /// No `battery` entry at all.
    Missing,
    /// One entry per device variant; most devices have exactly one.
    Variants(Vec<BatteryKind>),
    /// Structure we could not decode, kept as text.
    Raw(String),
}

impl Battery {
    /// Collapse to the tri-state. Variants only yield yes/no when they all agree.
    pub fn removable(&self) -> Removable {
        let Battery::Variants(kinds) = self else {
            return Removable::Unknown;
        };
        if !kinds.is_empty() && kinds.iter().all(|k| *k == BatteryKind::Removable(true)) {
            Removable::Yes
        } else if !kinds.is_empty() && kinds.iter().all(|k| *k == BatteryKind::Removable(false)) {
            Removable::No
        } else {
            Removable::Unknown
        }
    }
}

impl std::fmt::Display for Battery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Battery::Missing => write!(f, "???"),
            Battery::Variants(kinds) => {
                let parts: Vec<String> = kinds.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join("/"))
            }
            Battery::Raw(text) => write!(f, "{}", text),
        }
    }
}
