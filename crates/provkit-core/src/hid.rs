//! Device hardware identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::convert::bytes_to_hex;

/// Hardware identifier reported by a device.
///
/// Stored as an uppercase hex string; equality is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Hid(String);

impl Hid {
    /// Build from an identifier string, uppercasing it.
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().to_uppercase())
    }

    /// Build from the raw bytes a device reported.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes_to_hex(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Hid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Hid {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Hid> for String {
    fn from(value: Hid) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercases() {
        assert_eq!(Hid::new("35d9c0ae").as_str(), "35D9C0AE");
        assert_eq!(Hid::new("35d9c0ae"), Hid::new("35D9C0AE"));
    }

    #[test]
    fn test_from_bytes() {
        let hid = Hid::from_bytes(&[0x54, 0x00, 0x49, 0x00, 0x13, 0x50]);
        assert_eq!(hid.to_string(), "540049001350");
    }

    #[test]
    fn test_no_other_normalisation() {
        assert_ne!(Hid::new(" 35D9"), Hid::new("35D9"));
    }
}
