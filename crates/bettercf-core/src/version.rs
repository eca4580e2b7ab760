//! Artifact versions in `X.Y` or `X.Y.Z` form
//!
//! Unlike semver, a version may omit its micro segment entirely. The two
//! shapes are never compared against each other: [`Version`] only has a
//! partial order, and [`crate::resolve`] refuses sets that mix them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

static MAJOR_MINOR_MICRO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)$").expect("valid regex"));

static MAJOR_MINOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)\.([0-9]+)$").expect("valid regex"));

/// The textual grammar a version was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionFormat {
    /// `X.Y`
    MajorMinor,
    /// `X.Y.Z`
    MajorMinorMicro,
}

impl fmt::Display for VersionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MajorMinor => write!(f, "X.Y"),
            Self::MajorMinorMicro => write!(f, "X.Y.Z"),
        }
    }
}

/// Which segment an automatic bump should touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Increment {
    Major,
    #[default]
    Minor,
    Micro,
}

impl Increment {
    /// Pick the increment from a pair of CLI-style flags
    ///
    /// Neither flag means a minor bump. Both flags is an error.
    pub fn from_flags(major: bool, micro: bool) -> Result<Self> {
        match (major, micro) {
            (true, true) => Err(CoreError::ConflictingIncrement),
            (true, false) => Ok(Self::Major),
            (false, true) => Ok(Self::Micro),
            (false, false) => Ok(Self::Minor),
        }
    }
}

/// A dotted `major.minor[.micro]` version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u64,
    minor: u64,
    micro: Option<u64>,
}

impl Version {
    /// Create a two-segment version
    pub fn new(major: u64, minor: u64) -> Self {
        Self {
            major,
            minor,
            micro: None,
        }
    }

    /// Create a three-segment version
    pub fn with_micro(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro: Some(micro),
        }
    }

    /// Parse `X.Y.Z`, falling back to `X.Y`
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_as(input, VersionFormat::MajorMinorMicro)
            .or_else(|_| Self::parse_as(input, VersionFormat::MajorMinor))
            .map_err(|_| CoreError::version_format(input))
    }

    /// Parse strictly in one grammar
    pub fn parse_as(input: &str, format: VersionFormat) -> Result<Self> {
        let regex = match format {
            VersionFormat::MajorMinor => &*MAJOR_MINOR,
            VersionFormat::MajorMinorMicro => &*MAJOR_MINOR_MICRO,
        };
        let captures = regex
            .captures(input)
            .ok_or_else(|| CoreError::version_format(input))?;

        // Segments are bounded by u64; wider input is rejected like any other malformed input
        let segment = |i: usize| -> Result<u64> {
            captures[i]
                .parse::<u64>()
                .map_err(|_| CoreError::version_format(input))
        };

        let micro = match format {
            VersionFormat::MajorMinor => None,
            VersionFormat::MajorMinorMicro => Some(segment(3)?),
        };

        Ok(Self {
            major: segment(1)?,
            minor: segment(2)?,
            micro,
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn micro(&self) -> Option<u64> {
        self.micro
    }

    /// The grammar this version is written in
    pub fn format(&self) -> VersionFormat {
        if self.micro.is_some() {
            VersionFormat::MajorMinorMicro
        } else {
            VersionFormat::MajorMinor
        }
    }

    /// Bump major, zeroing minor and (when present) micro
    pub fn increment_major(&mut self) -> Result<()> {
        self.major = bumped(self.major, self, "major")?;
        self.minor = 0;
        self.micro = self.micro.map(|_| 0);
        Ok(())
    }

    /// Bump minor, zeroing micro when present
    pub fn increment_minor(&mut self) -> Result<()> {
        self.minor = bumped(self.minor, self, "minor")?;
        self.micro = self.micro.map(|_| 0);
        Ok(())
    }

    /// Bump micro. Fails on a two-segment version.
    pub fn increment_micro(&mut self) -> Result<()> {
        let micro = self.micro.ok_or_else(|| CoreError::NoMicroSegment {
            version: self.to_string(),
        })?;
        self.micro = Some(bumped(micro, self, "micro")?);
        Ok(())
    }

    /// Bump according to CLI-style flags, defaulting to a minor bump
    pub fn auto_increment(&mut self, major: bool, micro: bool) -> Result<()> {
        self.increment(Increment::from_flags(major, micro)?)
    }

    /// Apply an [`Increment`]
    pub fn increment(&mut self, increment: Increment) -> Result<()> {
        match increment {
            Increment::Major => self.increment_major(),
            Increment::Minor => self.increment_minor(),
            Increment::Micro => self.increment_micro(),
        }
    }

    /// Comparison key with micro treated as 0 when absent
    pub(crate) fn key(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.micro.unwrap_or(0))
    }
}

/// `segment + 1`, leaving `version` untouched on overflow
fn bumped(segment: u64, version: &Version, name: &'static str) -> Result<u64> {
    segment.checked_add(1).ok_or_else(|| CoreError::VersionOverflow {
        version: version.to_string(),
        segment: name,
    })
}

impl PartialOrd for Version {
    /// Versions of different formats are incomparable
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.format() != other.format() {
            return None;
        }
        Some(self.key().cmp(&other.key()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.micro {
            Some(micro) => write!(f, "{}.{}.{}", self.major, self.minor, micro),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_segments() {
        let v = Version::parse("1.2").unwrap();
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 2);
        assert_eq!(v.micro(), None);
        assert_eq!(v.format(), VersionFormat::MajorMinor);
    }

    #[test]
    fn test_parse_three_segments() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v, Version::with_micro(1, 2, 3));
        assert_eq!(v.format(), VersionFormat::MajorMinorMicro);
    }

    #[test]
    fn test_format_roundtrip() {
        for input in ["0.1", "10.20", "0.0.0", "3.14.159", "18446744073709551615.0"] {
            assert_eq!(Version::parse(input).unwrap().to_string(), input);
        }
    }

    #[test]
    fn test_leading_zeros_not_preserved() {
        assert_eq!(Version::parse("01.002").unwrap().to_string(), "1.2");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in [
            "", "1", "1.", ".1", "1.2.3.4", "v1.2", "1.2-beta", " 1.2", "1.2 ", "a.b", "1..2",
            "-1.2", "99999999999999999999.0",
        ] {
            assert!(
                matches!(Version::parse(input), Err(CoreError::VersionFormat { .. })),
                "expected '{}' to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_ascii_digits() {
        assert!(Version::parse("١.٢").is_err());
    }

    #[test]
    fn test_parse_as_is_strict() {
        assert!(Version::parse_as("1.2.3", VersionFormat::MajorMinor).is_err());
        assert!(Version::parse_as("1.2", VersionFormat::MajorMinorMicro).is_err());
        assert!(Version::parse_as("1.2", VersionFormat::MajorMinor).is_ok());
    }

    #[test]
    fn test_increment_major() {
        let mut v = Version::with_micro(1, 4, 7);
        v.increment_major().unwrap();
        assert_eq!(v.to_string(), "2.0.0");

        let mut v = Version::new(1, 4);
        v.increment_major().unwrap();
        assert_eq!(v.to_string(), "2.0");
    }

    #[test]
    fn test_increment_minor() {
        let mut v = Version::with_micro(1, 4, 7);
        v.increment_minor().unwrap();
        assert_eq!(v.to_string(), "1.5.0");

        let mut v = Version::new(1, 4);
        v.increment_minor().unwrap();
        assert_eq!(v.to_string(), "1.5");
    }

    #[test]
    fn test_increment_micro() {
        let mut v = Version::with_micro(1, 4, 0);
        v.increment_micro().unwrap();
        assert_eq!(v.to_string(), "1.4.1");

        let mut v = Version::new(1, 4);
        assert!(matches!(
            v.increment_micro(),
            Err(CoreError::NoMicroSegment { .. })
        ));
        assert_eq!(v, Version::new(1, 4));
    }

    #[test]
    fn test_increment_from_zero_micro() {
        // A micro of zero is still present and must be preserved as zero
        let mut v = Version::with_micro(0, 1, 0);
        v.increment_minor().unwrap();
        assert_eq!(v.to_string(), "0.2.0");
    }

    #[test]
    fn test_auto_increment_defaults_to_minor() {
        let mut v = Version::parse("0.3").unwrap();
        v.auto_increment(false, false).unwrap();
        assert_eq!(v.to_string(), "0.4");
    }

    #[test]
    fn test_auto_increment_dispatch() {
        let mut v = Version::parse("1.2.3").unwrap();
        v.auto_increment(true, false).unwrap();
        assert_eq!(v.to_string(), "2.0.0");

        v.auto_increment(false, true).unwrap();
        assert_eq!(v.to_string(), "2.0.1");
    }

    #[test]
    fn test_auto_increment_conflicting_flags() {
        let mut v = Version::parse("1.2.3").unwrap();
        assert!(matches!(
            v.auto_increment(true, true),
            Err(CoreError::ConflictingIncrement)
        ));
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn test_auto_increment_micro_without_micro() {
        let mut v = Version::parse("1.2").unwrap();
        assert!(v.auto_increment(false, true).is_err());
    }

    #[test]
    fn test_increment_at_segment_limit() {
        let mut v = Version::parse("18446744073709551615.0").unwrap();
        assert!(matches!(
            v.auto_increment(true, false),
            Err(CoreError::VersionOverflow { segment: "major", .. })
        ));
        assert_eq!(v.to_string(), "18446744073709551615.0");

        let mut v = Version::with_micro(1, u64::MAX, 3);
        assert!(matches!(
            v.increment_minor(),
            Err(CoreError::VersionOverflow { segment: "minor", .. })
        ));
        assert_eq!(v, Version::with_micro(1, u64::MAX, 3));

        let mut v = Version::with_micro(1, 2, u64::MAX);
        let err = v.increment_micro().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Cannot increment '1.2.18446744073709551615': the micro segment is already at its maximum");

        // Bumping a lower segment still works when a higher one is at the limit
        let mut v = Version::new(u64::MAX, 0);
        v.increment_minor().unwrap();
        assert_eq!(v, Version::new(u64::MAX, 1));
    }

    #[test]
    fn test_partial_ord_same_format() {
        assert!(Version::new(0, 2) > Version::new(0, 1));
        assert!(Version::new(1, 0) > Version::new(0, 99));
        assert!(Version::with_micro(0, 1, 10) > Version::with_micro(0, 1, 9));
    }

    #[test]
    fn test_partial_ord_mixed_format_is_incomparable() {
        let two = Version::new(0, 2);
        let three = Version::with_micro(0, 1, 5);
        assert_eq!(two.partial_cmp(&three), None);
        assert!(!(two > three));
        assert!(!(two < three));
    }

    #[test]
    fn test_serde_as_string() {
        let v = Version::with_micro(1, 0, 2);
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"1.0.2\"");

        let parsed: Version = serde_json::from_str("\"4.5\"").unwrap();
        assert_eq!(parsed, Version::new(4, 5));

        assert!(serde_json::from_str::<Version>("\"four\"").is_err());
    }

    #[test]
    fn test_error_message() {
        let err = Version::parse("foo").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Version 'foo' is not of the 'X.Y' or 'X.Y.Z' format");
    }
}
