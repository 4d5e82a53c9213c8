//! Host API version numbers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A semantic host API version.
///
/// Hosts usually report it packed into a `u32`: major in the top byte, minor
/// in the next byte and patch in the low 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Patch version.
    pub patch: u16,
}

impl ApiVersion {
    /// Create a version from its parts.
    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Decode a packed version number.
    #[must_use]
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            major: (packed >> 24) as u8,
            minor: ((packed >> 16) & 0xFF) as u8,
            patch: (packed & 0xFFFF) as u16,
        }
    }

    /// Encode as a packed version number.
    #[must_use]
    pub const fn packed(self) -> u32 {
        ((self.major as u32) << 24) | ((self.minor as u32) << 16) | self.patch as u32
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Configuration(format!("Invalid API version: '{s}'"));
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let patch = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(major, minor, patch))
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApiVersion> for String {
    fn from(version: ApiVersion) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_roundtrip() {
        let version = ApiVersion::new(30, 1, 2);
        assert_eq!(version.packed(), 0x1E01_0002);
        assert_eq!(ApiVersion::from_packed(0x1E01_0002), version);
    }

    #[test]
    fn test_parse_and_display() {
        let version: ApiVersion = "31.0.3".parse().unwrap();
        assert_eq!(version, ApiVersion::new(31, 0, 3));
        assert_eq!(version.to_string(), "31.0.3");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("31.0".parse::<ApiVersion>().is_err());
        assert!("31.0.3.4".parse::<ApiVersion>().is_err());
        assert!("a.b.c".parse::<ApiVersion>().is_err());
        assert!("300.0.0".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&ApiVersion::new(30, 2, 0)).unwrap();
        assert_eq!(json, r#""30.2.0""#);
        let back: ApiVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ApiVersion::new(30, 2, 0));
    }
}
