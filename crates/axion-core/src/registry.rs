//! Device registry - codename directory, maintainers and support groups
//!
//! The upstream registry is published in one of two shapes:
//! - structured JSON keyed by codename (`device_name`, `maintainer`, `support_group`)
//! - flat text, one `codename=Display Name=maintainer=support_url` line per device
//!
//! The shape is decided once from the response content type
//! ([`RegistryPayload::from_response`]) and both parsers produce the same
//! [`Registry`] snapshot.

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Lowercase codename -> display name, in upstream order
pub type DeviceDirectory = IndexMap<String, String>;
/// Maintainer -> display names of the devices they maintain
pub type MaintainerIndex = IndexMap<String, Vec<String>>;
/// Lowercase codename -> support group link
pub type SupportGroupIndex = IndexMap<String, String>;

/// Delimiter between fields of the flat-text format
const FLAT_TEXT_DELIMITER: char = '=';

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to parse structured registry: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// One immutable snapshot of the device registry
///
/// The three indexes are always built from the same upstream response and
/// are cached and expired as a single unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    devices: DeviceDirectory,
    maintainers: MaintainerIndex,
    support_groups: SupportGroupIndex,
}

/// A manufacturer heading in the device catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ManufacturerGroup<'a> {
    pub manufacturer: &'a str,
    /// (codename, display name) pairs, sorted by display name
    pub devices: Vec<(&'a str, &'a str)>,
}

impl Registry {
    /// Add one device. The codename is lower-cased; empty codenames are ignored.
    pub fn insert(
        &mut self,
        codename: &str,
        device_name: &str,
        maintainer: Option<&str>,
        support_group: Option<&str>,
    ) {
        let codename = codename.to_lowercase();
        if codename.is_empty() {
            return;
        }

        self.devices.insert(codename.clone(), device_name.to_string());

        if let Some(maintainer) = maintainer.filter(|m| !m.is_empty()) {
            self.maintainers
                .entry(maintainer.to_string())
                .or_default()
                .push(device_name.to_string());
        }

        if let Some(group) = support_group.filter(|g| !g.is_empty()) {
            self.support_groups.insert(codename, group.to_string());
        }
    }

    pub fn devices(&self) -> &DeviceDirectory {
        &self.devices
    }

    pub fn maintainers(&self) -> &MaintainerIndex {
        &self.maintainers
    }

    pub fn support_groups(&self) -> &SupportGroupIndex {
        &self.support_groups
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device_name(&self, codename: &str) -> Option<&str> {
        self.devices.get(codename).map(String::as_str)
    }

    pub fn support_group(&self, codename: &str) -> Option<&str> {
        self.support_groups.get(codename).map(String::as_str)
    }

    /// Find the maintainer of a device
    ///
    /// The index only records display names, so this scans every maintainer
    /// list for the display name behind `codename` and returns the first hit.
    /// Two codenames sharing a display name are indistinguishable here.
    pub fn find_maintainer(&self, codename: &str) -> Option<&str> {
        let device_name = self.device_name(codename)?;
        self.maintainers
            .iter()
            .find(|(_, devices)| devices.iter().any(|d| d == device_name))
            .map(|(maintainer, _)| maintainer.as_str())
    }

    /// Codenames that contain, or are contained in, `query`
    ///
    /// Returned in directory order, at most `limit` entries, as
    /// (codename, display name) pairs.
    pub fn suggestions(&self, query: &str, limit: usize) -> Vec<(&str, &str)> {
        self.devices
            .iter()
            .filter(|(codename, _)| codename.contains(query) || query.contains(codename.as_str()))
            .take(limit)
            .map(|(codename, name)| (codename.as_str(), name.as_str()))
            .collect()
    }

    /// Group all devices by manufacturer (first word of the display name)
    ///
    /// Devices are sorted by display name; groups appear in the order their
    /// first device appears in that sorted list.
    pub fn catalog(&self) -> Vec<ManufacturerGroup<'_>> {
        let mut sorted: Vec<(&str, &str)> = self
            .devices
            .iter()
            .map(|(codename, name)| (codename.as_str(), name.as_str()))
            .collect();
        sorted.sort_by_cached_key(|(_, name)| (name.to_lowercase(), name.to_string()));

        let mut groups: IndexMap<&str, Vec<(&str, &str)>> = IndexMap::new();
        for (codename, name) in sorted {
            let manufacturer = name.split_whitespace().next().unwrap_or("");
            groups.entry(manufacturer).or_default().push((codename, name));
        }

        groups
            .into_iter()
            .map(|(manufacturer, devices)| ManufacturerGroup {
                manufacturer,
                devices,
            })
            .collect()
    }
}

/// Raw registry response, tagged by the shape it will be parsed as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryPayload {
    Structured(String),
    FlatText(String),
}

impl RegistryPayload {
    /// Tag a response body by its content type
    ///
    /// Only an `application/json` content type selects the structured parser;
    /// anything else, including a missing header, is treated as flat text.
    pub fn from_response(content_type: Option<&str>, body: String) -> Self {
        match content_type {
            Some(ct) if ct.to_ascii_lowercase().contains("application/json") => {
                Self::Structured(body)
            }
            _ => Self::FlatText(body),
        }
    }

    /// Short name of the shape, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Structured(_) => "structured",
            Self::FlatText(_) => "flat-text",
        }
    }

    pub fn parse(&self) -> Result<Registry, RegistryError> {
        match self {
            Self::Structured(body) => parse_structured(body),
            Self::FlatText(body) => Ok(parse_flat_text(body)),
        }
    }
}

/// One device in the structured registry
#[derive(Debug, Deserialize)]
struct StructuredEntry {
    device_name: String,
    #[serde(default)]
    maintainer: Option<String>,
    #[serde(default)]
    support_group: Option<String>,
}

/// Parse the structured (JSON) registry
///
/// Only a body that is not a JSON object fails. Individual entries that do
/// not match the expected shape are logged and skipped.
pub fn parse_structured(body: &str) -> Result<Registry, RegistryError> {
    let entries: IndexMap<String, serde_json::Value> = serde_json::from_str(body)?;

    let mut registry = Registry::default();
    for (codename, value) in entries {
        let entry: StructuredEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(codename = %codename, error = %e, "Skipping malformed registry entry");
                continue;
            }
        };
        registry.insert(
            &codename,
            &entry.device_name,
            entry.maintainer.as_deref(),
            entry.support_group.as_deref(),
        );
    }
    Ok(registry)
}

/// Parse the flat-text registry
///
/// Comment lines (`#`) and lines without a delimiter are skipped. Each other
/// line is split into at most four fields, so a trailing URL may itself
/// contain the delimiter. Missing trailing fields are simply absent.
pub fn parse_flat_text(body: &str) -> Registry {
    let mut registry = Registry::default();

    for line in body.lines() {
        if line.trim().is_empty()
            || line.starts_with('#')
            || !line.contains(FLAT_TEXT_DELIMITER)
        {
            continue;
        }

        let mut fields = line.splitn(4, FLAT_TEXT_DELIMITER).map(str::trim);
        let (Some(codename), Some(device_name)) = (fields.next(), fields.next()) else {
            continue;
        };
        let maintainer = fields.next();
        let support_group = fields.next();

        registry.insert(codename, device_name, maintainer, support_group);
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRUCTURED: &str = r#"{
        "PIPA": {"device_name": "Xiaomi Pad 6", "maintainer": "rmp", "support_group": "https://t.me/axion_pipa"},
        "Marble": {"device_name": "Poco F5", "maintainer": "rmp"},
        "a71": {"device_name": "Samsung Galaxy A71"}
    }"#;

    #[test]
    fn test_structured_keys_are_lowercased() {
        let registry = parse_structured(STRUCTURED).unwrap();

        let keys: Vec<&str> = registry.devices().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["pipa", "marble", "a71"]);
        assert_eq!(registry.device_name("pipa"), Some("Xiaomi Pad 6"));
        assert_eq!(registry.support_group("pipa"), Some("https://t.me/axion_pipa"));
        assert_eq!(registry.support_group("marble"), None);
        assert_eq!(
            registry.maintainers().get("rmp").unwrap(),
            &vec!["Xiaomi Pad 6".to_string(), "Poco F5".to_string()]
        );
    }

    #[test]
    fn test_structured_invalid_json() {
        assert!(parse_structured("pipa=Xiaomi Pad 6").is_err());
        assert!(parse_structured(r#"["pipa", "marble"]"#).is_err());
    }

    #[test]
    fn test_structured_skips_malformed_entries() {
        let registry = parse_structured(
            r#"{
                "pipa": {"device_name": "Xiaomi Pad 6", "maintainer": "rmp"},
                "marble": {"maintainer": "rmp"},
                "munch": {"device_name": null},
                "a71": {"device_name": "Samsung Galaxy A71", "maintainer": 7},
                "alioth": {"device_name": "Poco F3"}
            }"#,
        )
        .unwrap();

        let keys: Vec<&str> = registry.devices().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["pipa", "alioth"]);
        assert_eq!(registry.find_maintainer("pipa"), Some("rmp"));
    }

    #[test]
    fn test_flat_text_skips_comments_and_undelimited_lines() {
        let body = "# codename=name=maintainer=group\n\
                    just some words\n\
                    PIPA = Xiaomi Pad 6 = rmp = https://t.me/join?group=pipa\n";
        let registry = parse_flat_text(body);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.device_name("pipa"), Some("Xiaomi Pad 6"));
        assert_eq!(registry.find_maintainer("pipa"), Some("rmp"));
        assert_eq!(
            registry.support_group("pipa"),
            Some("https://t.me/join?group=pipa")
        );
    }

    #[test]
    fn test_flat_text_missing_trailing_fields() {
        let body = "a71=Samsung Galaxy A71\r\nmarble=Poco F5=\r\n\r\n";
        let registry = parse_flat_text(body);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.device_name("a71"), Some("Samsung Galaxy A71"));
        assert_eq!(registry.find_maintainer("a71"), None);
        assert_eq!(registry.find_maintainer("marble"), None);
        assert!(registry.support_groups().is_empty());
    }

    #[test]
    fn test_find_maintainer() {
        let registry = parse_structured(STRUCTURED).unwrap();
        assert_eq!(registry.find_maintainer("marble"), Some("rmp"));
        assert_eq!(registry.find_maintainer("a71"), None);
        assert_eq!(registry.find_maintainer("unknown"), None);
    }

    #[test]
    fn test_suggestions_limit_and_order() {
        let registry = parse_flat_text(
            "pipa=Xiaomi Pad 6\npipa2=Pad 2\nbpipa=Pad B\nxpipax=Pad X\nmarble=Poco F5\n",
        );

        let found = registry.suggestions("pip", 3);
        assert_eq!(
            found,
            vec![("pipa", "Xiaomi Pad 6"), ("pipa2", "Pad 2"), ("bpipa", "Pad B")]
        );

        // Query containing a known codename
        let found = registry.suggestions("marblepro", 3);
        assert_eq!(found, vec![("marble", "Poco F5")]);

        assert!(registry.suggestions("zzz", 3).is_empty());
    }

    #[test]
    fn test_catalog_grouping() {
        let registry = parse_flat_text(
            "pipa=Xiaomi Pad 6\nmarble=Poco F5\na71=Samsung Galaxy A71\nmunch=Poco F4\n",
        );
        let catalog = registry.catalog();

        let manufacturers: Vec<&str> = catalog.iter().map(|g| g.manufacturer).collect();
        assert_eq!(manufacturers, vec!["Poco", "Samsung", "Xiaomi"]);
        assert_eq!(catalog[0].devices, vec![("munch", "Poco F4"), ("marble", "Poco F5")]);
    }

    #[test]
    fn test_payload_dispatch_by_content_type() {
        let json = RegistryPayload::from_response(
            Some("application/json; charset=utf-8"),
            STRUCTURED.to_string(),
        );
        assert_eq!(json.kind(), "structured");
        assert_eq!(json.parse().unwrap().len(), 3);

        let text = RegistryPayload::from_response(Some("text/plain"), "pipa=Xiaomi Pad 6".into());
        assert_eq!(text.kind(), "flat-text");

        let missing = RegistryPayload::from_response(None, "pipa=Xiaomi Pad 6".into());
        assert_eq!(missing.parse().unwrap().device_name("pipa"), Some("Xiaomi Pad 6"));
    }
}
