use std::collections::BTreeSet;

use anyhow::Result;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::models::{Battery, BatteryKind, Device, WIKI_DEVICE_URL};

/// Reasons a descriptor cannot be turned into a [`Device`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("descriptor is not a mapping")]
    NotAMapping,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` has an unexpected shape: {found}")]
    InvalidField { field: &'static str, found: String },
}

/// Normalizes wiki device descriptors.
///
/// Required keys: `vendor_short`, `name`, `maintainers`, `versions`, `ram`,
/// `storage`, `codename`. Everything else is optional and copied as text.
pub struct DeviceParser {
    screen_re: Regex,
}

impl DeviceParser {
    /// Create a new `DeviceParser`.
    pub fn new() -> Result<Self> {
        Ok(Self {
            screen_re: Regex::new(r"(\d+(?:\.\d+)?) in")?,
        })
    }

    /// Parse one YAML descriptor. `commit_date` is the wiki's last change of the file.
    pub fn parse(&self, doc: &Value, commit_date: String) -> Result<Device, ParseError> {
        let map = doc.as_mapping().ok_or(ParseError::NotAMapping)?;

        let vendor_short = required_text(map, "vendor_short")?;
        let name = required_text(map, "name")?;
        let codename = required_text(map, "codename")?;
        let ram = required_text(map, "ram")?;
        let storage = required_text(map, "storage")?;
        let short_name = capitalize(&format!("{} {}", vendor_short, name));

        let maintainer_count = match map.get("maintainers") {
            None => return Err(ParseError::MissingField("maintainers")),
            Some(Value::Null) => 0,
            Some(Value::Sequence(items)) => items.len(),
            Some(other) => {
                return Err(ParseError::InvalidField {
                    field: "maintainers",
                    found: render_text(other),
                })
            }
        };

        let raw_versions: Vec<&Value> = match map.get("versions") {
            None => return Err(ParseError::MissingField("versions")),
            Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items.iter().collect(),
            Some(single) => vec![single],
        };
        let mut supported_versions = BTreeSet::new();
        let mut version_labels = Vec::new();
        for raw in raw_versions {
            match coerce_version(raw) {
                Some(version) => {
                    supported_versions.insert(version);
                    version_labels.push(render_text(raw));
                }
                None => warn!(
                    device = %short_name,
                    entry = %render_text(raw),
                    "ignoring version entry that is not a number"
                ),
            }
        }

        let screen = map
            .get("screen")
            .filter(|v| !v.is_null())
            .map(|v| self.normalize_screen(v));

        let models = match map.get("models") {
            Some(Value::Sequence(items)) => items.iter().map(render_text).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(single) => vec![render_text(single)],
        };

        let battery = decode_battery(&short_name, map.get("battery"));
        let wiki_link = format!("{}{}", WIKI_DEVICE_URL, codename);

        Ok(Device {
            codename,
            vendor_short,
            name,
            short_name,
            maintainer_count,
            supported_versions,
            version_labels,
            ram,
            storage,
            release: optional_text(map, "release"),
            soc: optional_text(map, "soc"),
            screen,
            battery,
            models,
            wiki_commit_date: commit_date,
            wiki_link,
        })
    }

    /// `"5.5 in (140 mm)"` → `"5.5"`; anything without an inch size is kept verbatim.
    fn normalize_screen(&self, value: &Value) -> String {
        // Newer descriptors nest the size: `screen: {size: 6.1 in, ...}`
        let text = match value.get("size") {
            Some(size) if value.is_mapping() => render_text(size),
            _ => render_text(value),
        };
        match self.screen_re.captures(&text) {
            Some(caps) => caps[1].to_string(),
            None => text,
        }
    }
}

fn required_text(map: &Mapping, field: &'static str) -> Result<String, ParseError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(ParseError::MissingField(field)),
        Some(value) => Ok(render_text(value)),
    }
}

fn optional_text(map: &Mapping, field: &str) -> String {
    map.get(field).map(render_text).unwrap_or_default()
}

/// Flatten a YAML value into a single line of text.
pub fn render_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => items.iter().map(render_text).collect::<Vec<_>>().join(", "),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", render_text(k), render_text(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Tagged(tagged) => render_text(&tagged.value),
    }
}

/// Truncate a version entry (`17`, `15.1`, `"18.1"`) to its major number.
fn coerce_version(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(whole) => u32::try_from(whole).ok(),
            None => n.as_f64().and_then(truncate_version),
        },
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(truncate_version),
        _ => None,
    }
}

fn truncate_version(v: f64) -> Option<u32> {
    if v.is_finite() && v >= 0.0 && v < f64::from(u32::MAX) {
        Some(v.trunc() as u32)
    } else {
        None
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decode_battery(short_name: &str, value: Option<&Value>) -> Battery {
    let items: Vec<&Value> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items.iter().collect(),
        Some(single) => vec![single],
    };
    if items.is_empty() {
        warn!(device = %short_name, "no battery entry");
        return Battery::Missing;
    }

    // e.g. 'oneplus 3 / 3T' lists one battery per model:
    // [{3: {removable: false, ...}}, {3T: {removable: false, ...}}]
    let kinds: Option<Vec<BatteryKind>> = items
        .iter()
        .map(|v| decode_battery_variants(v))
        .collect::<Option<Vec<_>>>()
        .map(|per_item| per_item.concat());
    match kinds {
        Some(kinds) => Battery::Variants(kinds),
        None => {
            let raw = items
                .iter()
                .map(|v| render_text(v))
                .collect::<Vec<_>>()
                .join(" ");
            error!(device = %short_name, battery = %raw, "cannot parse battery info");
            Battery::Raw(raw)
        }
    }
}

/// Decode one battery entry. Mappings keyed by model (`{7a: {...}, 7s: {...}}`)
/// yield one kind per model.
fn decode_battery_variants(value: &Value) -> Option<Vec<BatteryKind>> {
    match value {
        Value::String(s) if s == "None" => Some(vec![BatteryKind::NoBattery]),
        Value::Mapping(map) => match map.get("removable") {
            Some(Value::Bool(removable)) => Some(vec![BatteryKind::Removable(*removable)]),
            Some(Value::Null) => Some(vec![BatteryKind::Unspecified]),
            Some(_) => None,
            None => {
                let nested = map.values().filter(|v| is_battery_entry(v)).count();
                if nested == 0 {
                    Some(vec![BatteryKind::Unspecified])
                } else if nested == map.len() {
                    let mut kinds = Vec::with_capacity(nested);
                    for inner in map.values() {
                        kinds.extend(decode_battery_variants(inner)?);
                    }
                    Some(kinds)
                } else {
                    // Model-keyed entries mixed with plain battery fields.
                    None
                }
            }
        },
        _ => None,
    }
}

fn is_battery_entry(value: &Value) -> bool {
    value.is_mapping() || value.as_str() == Some("None")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Removable;

    fn parse(yaml: &str) -> Result<Device, ParseError> {
        let doc: Value = serde_yaml::from_str(yaml).unwrap();
        DeviceParser::new().unwrap().parse(&doc, "2020-01-02".to_string())
    }

    const ZETA: &str = r#"
codename: zeta
vendor_short: acme
name: Zeta
maintainers: [a, b, c]
versions: [16, 17]
ram: 3 GB
storage: 32 GB
battery: {removable: true}
screen: 5.5 in display
models: [Z1, Z2]
"#;

    #[test]
    fn test_parse_example_device() {
        let device = parse(ZETA).unwrap();
        assert_eq!(device.maintainer_count, 3);
        assert_eq!(device.short_name, "Acme Zeta");
        assert_eq!(device.screen.as_deref(), Some("5.5"));
        assert_eq!(device.removable_battery(), Removable::Yes);
        assert_eq!(device.supported_versions, BTreeSet::from([16, 17]));
        assert_eq!(device.models, vec!["Z1", "Z2"]);
        assert_eq!(device.wiki_link, "https://wiki.lineageos.org/devices/zeta");
        assert_eq!(device.wiki_commit_date, "2020-01-02");
        assert_eq!(device.release, "");
    }

    #[test]
    fn test_missing_required_field() {
        let yaml = ZETA.replace("ram: 3 GB\n", "");
        assert!(matches!(parse(&yaml), Err(ParseError::MissingField("ram"))));

        let yaml = ZETA.replace("maintainers: [a, b, c]\n", "");
        assert!(matches!(parse(&yaml), Err(ParseError::MissingField("maintainers"))));
    }

    #[test]
    fn test_not_a_mapping() {
        assert!(matches!(parse("- a\n- b\n"), Err(ParseError::NotAMapping)));
    }

    #[test]
    fn test_empty_or_null_maintainers() {
        let yaml = ZETA.replace("maintainers: [a, b, c]", "maintainers: []");
        assert_eq!(parse(&yaml).unwrap().maintainer_count, 0);
        let yaml = ZETA.replace("maintainers: [a, b, c]", "maintainers:");
        assert_eq!(parse(&yaml).unwrap().maintainer_count, 0);
    }

    #[test]
    fn test_fractional_and_invalid_versions() {
        let yaml = ZETA.replace("versions: [16, 17]", "versions: [14.1, 15.1, '17.1', nope]");
        let device = parse(&yaml).unwrap();
        assert_eq!(device.supported_versions, BTreeSet::from([14, 15, 17]));
        assert_eq!(device.version_labels, vec!["14.1", "15.1", "17.1"]);
    }

    #[test]
    fn test_screen_without_inches_is_kept() {
        let yaml = ZETA.replace("screen: 5.5 in display", "screen: none");
        assert_eq!(parse(&yaml).unwrap().screen.as_deref(), Some("none"));

        let yaml = ZETA.replace("screen: 5.5 in display\n", "");
        assert_eq!(parse(&yaml).unwrap().screen, None);

        let yaml = ZETA.replace("screen: 5.5 in display", "screen: 127 mm (5 in)");
        assert_eq!(parse(&yaml).unwrap().screen.as_deref(), Some("5"));
    }

    #[test]
    fn test_battery_shapes() {
        let cases = [
            ("battery: {removable: false, capacity: 3000}", "no", Removable::No),
            ("battery: {capacity: 3000}", "-", Removable::Unknown),
            ("battery: None", "-", Removable::Unknown),
            (
                "battery:\n  - {3: {removable: false}}\n  - {3T: {removable: false}}",
                "no/no",
                Removable::No,
            ),
            (
                "battery:\n  - {removable: true}\n  - {removable: false}",
                "yes/no",
                Removable::Unknown,
            ),
            (
                "battery: {7a: {removable: true}, 7s: {removable: true}}",
                "yes/yes",
                Removable::Yes,
            ),
            (
                "battery:\n  - {3: {removable: false}, 3T: None}\n  - {removable: false}",
                "no/-/no",
                Removable::Unknown,
            ),
        ];
        for (line, display, removable) in cases {
            let yaml = ZETA.replace("battery: {removable: true}", line);
            let device = parse(&yaml).unwrap();
            assert_eq!(device.battery.to_string(), display, "{}", line);
            assert_eq!(device.removable_battery(), removable, "{}", line);
        }
    }

    #[test]
    fn test_missing_battery() {
        let yaml = ZETA.replace("battery: {removable: true}\n", "");
        let device = parse(&yaml).unwrap();
        assert_eq!(device.battery, Battery::Missing);
        assert_eq!(device.removable_battery(), Removable::Unknown);
    }

    #[test]
    fn test_unrecognized_battery_falls_back_to_text() {
        let yaml = ZETA.replace("battery: {removable: true}", "battery: [{removable: maybe}, 42]");
        let device = parse(&yaml).unwrap();
        assert_eq!(device.battery, Battery::Raw("removable: maybe 42".to_string()));
        assert_eq!(device.removable_battery(), Removable::Unknown);

        let yaml = ZETA.replace(
            "battery: {removable: true}",
            "battery: {7a: {removable: true}, capacity: 2800}",
        );
        let device = parse(&yaml).unwrap();
        assert_eq!(
            device.battery,
            Battery::Raw("7a: removable: true, capacity: 2800".to_string())
        );
    }
}
