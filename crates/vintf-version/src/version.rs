//! Two-part interface versions and sepolicy versions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Major version under which AIDL interfaces are stored.
///
/// AIDL interfaces carry a single version number. Storing them as
/// `(FAKE_AIDL_MAJOR_VERSION, n)` lets them share the (major, minor) model
/// without colliding with any real major version line.
pub const FAKE_AIDL_MAJOR_VERSION: u64 = u64::MAX;

/// Version assumed for an AIDL interface that does not declare one.
pub const DEFAULT_AIDL_MINOR_VERSION: u64 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version: {0:?}")]
pub struct VersionParseError(pub String);

/// A two-part interface version, ordered lexicographically by (major, minor).
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64) -> Self {
        Version { major, minor }
    }

    /// Wrap a single AIDL version number in the fake major line.
    pub const fn from_aidl(minor: u64) -> Self {
        Version::new(FAKE_AIDL_MAJOR_VERSION, minor)
    }

    pub fn is_aidl(&self) -> bool {
        self.major == FAKE_AIDL_MAJOR_VERSION
    }

    /// True if an interface installed at `self` serves clients of `asked`:
    /// same major line, equal or newer minor.
    pub fn minor_at_least(&self, asked: &Version) -> bool {
        self.major == asked.major && self.minor >= asked.minor
    }

    /// Render the single AIDL version number.
    pub fn to_aidl_string(&self) -> String {
        self.minor.to_string()
    }

    /// Parse a bare AIDL version number into the fake major line.
    pub fn parse_aidl(s: &str) -> Result<Version, VersionParseError> {
        let minor: u64 = s.parse().map_err(|_| VersionParseError(s.to_string()))?;
        Ok(Version::from_aidl(minor))
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
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| VersionParseError(s.to_string()))?;
        let major: u64 = major.parse().map_err(|_| VersionParseError(s.to_string()))?;
        let minor: u64 = minor.parse().map_err(|_| VersionParseError(s.to_string()))?;
        Ok(Version::new(major, minor))
    }
}

/// A sepolicy version. The minor part is optional: a bare major denotes the
/// versioned-release scheme where only the major number is meaningful.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SepolicyVersion {
    pub major: u64,
    pub minor: Option<u64>,
}

impl SepolicyVersion {
    pub const fn new(major: u64, minor: Option<u64>) -> Self {
        SepolicyVersion { major, minor }
    }
}

impl fmt::Display for SepolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{}", self.major, minor),
            None => write!(f, "{}", self.major),
        }
    }
}

impl FromStr for SepolicyVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Bare major first (versioned-release scheme), then major.minor.
        if let Ok(major) = s.parse::<u64>() {
            return Ok(SepolicyVersion::new(major, None));
        }
        let v: Version = s.parse()?;
        Ok(SepolicyVersion::new(v.major, Some(v.minor)))
    }
}
