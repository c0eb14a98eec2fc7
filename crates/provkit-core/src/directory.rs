//! HID to license lookup table.
//!
//! Built once before a provisioning run and read-only afterwards, so it can
//! be shared behind an `Arc` between the session worker and any UI.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::convert::{ConvertError, base64_to_bytes, bytes_to_hex, hex_to_bytes};
use crate::hid::Hid;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Row {row}: missing {field}")]
    MissingField { row: usize, field: &'static str },

    #[error("Row {row}: invalid component id {value:?}")]
    InvalidComponentId { row: usize, value: String },

    #[error("Row {row}: invalid license: {source}")]
    InvalidLicense {
        row: usize,
        #[source]
        source: ConvertError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One license payload for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLicense {
    pub component_id: u16,
    pub license: Vec<u8>,
}

impl ComponentLicense {
    pub fn license_hex(&self) -> String {
        bytes_to_hex(&self.license)
    }
}

/// Licenses for one device, in import order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseSet {
    entries: Vec<ComponentLicense>,
}

static EMPTY: LicenseSet = LicenseSet { entries: Vec::new() };

impl LicenseSet {
    /// Add a component, replacing an earlier license for the same component
    /// in place.
    fn insert(&mut self, component_id: u16, license: Vec<u8>) {
        match self.entries.iter_mut().find(|e| e.component_id == component_id) {
            Some(entry) => entry.license = license,
            None => self.entries.push(ComponentLicense {
                component_id,
                license,
            }),
        }
    }

    pub fn get(&self, component_id: u16) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.component_id == component_id)
            .map(|e| e.license.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentLicense> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a LicenseSet {
    type Item = &'a ComponentLicense;
    type IntoIter = std::slice::Iter<'a, ComponentLicense>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Encoding of the license cells of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseEncoding {
    #[default]
    Hex,
    Base64,
}

/// One imported row: `(hid, component_id, license_hex)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirectoryRow {
    pub hid: String,
    /// Component id as hex (`03E8`, `0x03E8`).
    pub component: String,
    /// License payload as hex.
    pub license: String,
}

impl DirectoryRow {
    pub fn new(hid: impl Into<String>, component: impl Into<String>, license: impl Into<String>) -> Self {
        Self {
            hid: hid.into(),
            component: component.into(),
            license: license.into(),
        }
    }

    /// Row whose license cell is base64, transcoded to hex.
    pub fn from_base64(
        hid: impl Into<String>,
        component: impl Into<String>,
        license_b64: &str,
    ) -> Result<Self, ConvertError> {
        let license = bytes_to_hex(&base64_to_bytes(license_b64)?);
        Ok(Self::new(hid, component, license))
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    encoding: LicenseEncoding,
    #[serde(default, rename = "row")]
    rows: Vec<DirectoryRow>,
}

/// Totals for operator summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub hid_count: usize,
    pub license_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Directory {
    map: HashMap<Hid, LicenseSet>,
    /// HIDs in first-seen order.
    order: Vec<Hid>,
}

impl Directory {
    /// Build from imported rows. Any empty field fails the whole load.
    pub fn load<I>(rows: I) -> Result<Self, DirectoryError>
    where
        I: IntoIterator<Item = DirectoryRow>,
    {
        let mut directory = Directory::default();
        for (index, row) in rows.into_iter().enumerate() {
            let row_no = index + 1;
            let hid = required(&row.hid, row_no, "hid")?;
            let component = required(&row.component, row_no, "component")?;
            let license = required(&row.license, row_no, "license")?;

            let component_id = parse_component_id(component).ok_or_else(|| {
                DirectoryError::InvalidComponentId {
                    row: row_no,
                    value: component.to_string(),
                }
            })?;
            let license = hex_to_bytes(license).map_err(|source| DirectoryError::InvalidLicense {
                row: row_no,
                source,
            })?;

            directory.insert(Hid::new(hid), component_id, license);
        }

        let stats = directory.stats();
        debug!(hids = stats.hid_count, licenses = stats.license_count, "Directory built");
        Ok(directory)
    }

    /// Load rows from a TOML file.
    ///
    /// ```toml
    /// encoding = "base64"
    ///
    /// [[row]]
    /// hid = "540049001350564846323020"
    /// component = "03E8"
    /// license = "q80="
    /// ```
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let file: DirectoryFile = toml::from_str(&content)?;

        let rows = match file.encoding {
            LicenseEncoding::Hex => file.rows,
            LicenseEncoding::Base64 => file
                .rows
                .into_iter()
                .enumerate()
                .map(|(index, row)| {
                    if row.license.trim().is_empty() {
                        return Ok(row);
                    }
                    DirectoryRow::from_base64(row.hid, row.component, &row.license).map_err(|source| {
                        DirectoryError::InvalidLicense {
                            row: index + 1,
                            source,
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let directory = Self::load(rows)?;
        let stats = directory.stats();
        info!(
            path = %path.display(),
            hids = stats.hid_count,
            licenses = stats.license_count,
            "Loaded license directory"
        );
        Ok(directory)
    }

    fn insert(&mut self, hid: Hid, component_id: u16, license: Vec<u8>) {
        if !self.map.contains_key(&hid) {
            self.order.push(hid.clone());
        }
        self.map.entry(hid).or_default().insert(component_id, license);
    }

    /// Licenses for `hid`; empty when the device is unknown.
    pub fn lookup(&self, hid: &Hid) -> &LicenseSet {
        self.map.get(hid).unwrap_or(&EMPTY)
    }

    pub fn contains(&self, hid: &Hid) -> bool {
        self.map.contains_key(hid)
    }

    pub fn hids(&self) -> impl Iterator<Item = &Hid> {
        self.order.iter()
    }

    pub fn stats(&self) -> DirectoryStats {
        DirectoryStats {
            hid_count: self.map.len(),
            license_count: self
                .map
                .values()
                .flat_map(LicenseSet::iter)
                .filter(|e| !e.license.is_empty())
                .count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn required<'a>(value: &'a str, row: usize, field: &'static str) -> Result<&'a str, DirectoryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DirectoryError::MissingField { row, field })
    } else {
        Ok(trimmed)
    }
}

fn parse_component_id(value: &str) -> Option<u16> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Directory {
        Directory::load(vec![
            DirectoryRow::new("35d9c0ae", "03E8", "AABB"),
            DirectoryRow::new("35D9C0AE", "03E9", "CCDD"),
            DirectoryRow::new("11223344", "0x03E8", "EE"),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_preserves_insertion_order() {
        let dir = sample();
        let set = dir.lookup(&Hid::new("35D9C0AE"));
        let ids: Vec<u16> = set.iter().map(|e| e.component_id).collect();
        assert_eq!(ids, vec![0x03E8, 0x03E9]);
        assert_eq!(set.get(0x03E9), Some(&[0xCC, 0xDD][..]));
        assert_eq!(set.iter().next().unwrap().license_hex(), "AABB");
    }

    #[test]
    fn test_unknown_hid_is_empty_not_error() {
        let dir = sample();
        let set = dir.lookup(&Hid::new("DEADBEEF"));
        assert!(set.is_empty());
        assert!(!dir.contains(&Hid::new("DEADBEEF")));
    }

    #[test]
    fn test_stats() {
        let dir = sample();
        assert_eq!(
            dir.stats(),
            DirectoryStats {
                hid_count: 2,
                license_count: 3
            }
        );
        let hids: Vec<&str> = dir.hids().map(Hid::as_str).collect();
        assert_eq!(hids, vec!["35D9C0AE", "11223344"]);
    }

    #[test]
    fn test_duplicate_component_replaces_in_place() {
        let dir = Directory::load(vec![
            DirectoryRow::new("AA", "1", "01"),
            DirectoryRow::new("AA", "2", "02"),
            DirectoryRow::new("AA", "1", "03"),
        ])
        .unwrap();
        let set = dir.lookup(&Hid::new("AA"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1), Some(&[0x03][..]));
        assert_eq!(set.iter().next().unwrap().component_id, 1);
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = Directory::load(vec![
            DirectoryRow::new("AA", "1", "01"),
            DirectoryRow::new("BB", " ", "01"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            DirectoryError::MissingField {
                row: 2,
                field: "component"
            }
        ));
    }

    #[test]
    fn test_invalid_cells_rejected() {
        assert!(matches!(
            Directory::load(vec![DirectoryRow::new("AA", "XYZ", "01")]),
            Err(DirectoryError::InvalidComponentId { row: 1, .. })
        ));
        assert!(matches!(
            Directory::load(vec![DirectoryRow::new("AA", "1", "0G")]),
            Err(DirectoryError::InvalidLicense { row: 1, .. })
        ));
    }

    #[test]
    fn test_row_from_base64() {
        let row = DirectoryRow::from_base64("AA", "03E8", "q80=").unwrap();
        assert_eq!(row.license, "ABCD");
        assert!(DirectoryRow::from_base64("AA", "03E8", "!!").is_err());
    }

    #[test]
    fn test_load_file_base64() {
        let path = std::env::temp_dir().join(format!("provkit-dir-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
encoding = "base64"

[[row]]
hid = "540049001350564846323020"
component = "03E8"
license = "q80="

[[row]]
hid = "540049001350564846323020"
component = "03E9"
license = "7w=="
"#,
        )
        .unwrap();

        let dir = Directory::load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let set = dir.lookup(&Hid::new("540049001350564846323020"));
        assert_eq!(set.get(0x03E8), Some(&[0xAB, 0xCD][..]));
        assert_eq!(set.get(0x03E9), Some(&[0xEF][..]));
    }
}
