//! Document versions.
//!
//! A version is a `major.minor` pair. The store compares versions by exact
//! equality only; the ordering exists for sorting and display.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Two-component document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

/// Error returned when a version string is malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version `{input}`: expected <major>.<minor>")]
pub struct VersionParseError {
    pub input: String,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Version { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError {
            input: s.to_string(),
        };
        let trimmed = s.trim();
        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, minor),
            // A bare major number means minor 0
            None => (trimmed, "0"),
        };
        let major = major.parse::<u32>().map_err(|_| err())?;
        let minor = minor.parse::<u32>().map_err(|_| err())?;
        Ok(Version { major, minor })
    }
}

impl From<(u32, u32)> for Version {
    fn from((major, minor): (u32, u32)) -> Self {
        Version { major, minor }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_and_display() {
        let v: Version = "2.7".parse().unwrap();
        assert_eq!(v, Version::new(2, 7));
        assert_eq!(v.to_string(), "2.7");
        assert_eq!("3".parse::<Version>().unwrap(), Version::new(3, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
        assert!("1.2.3".parse::<Version>().is_err());
        assert!("-1.0".parse::<Version>().is_err());
    }

    #[test]
    fn test_equality_is_exact() {
        assert_ne!(Version::new(1, 0), Version::new(1, 1));
        assert!(Version::new(1, 9) < Version::new(2, 0));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Version::new(1, 4)).unwrap();
        assert_eq!(json, "\"1.4\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Version::new(1, 4));
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(major in 0u32..10_000, minor in 0u32..10_000) {
            let v = Version::new(major, minor);
            prop_assert_eq!(v.to_string().parse::<Version>().unwrap(), v);
        }
    }
}
