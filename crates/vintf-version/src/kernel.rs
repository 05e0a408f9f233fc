//! Three-part kernel versions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::version::VersionParseError;

/// A kernel version, e.g. `3.18.22`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct KernelVersion {
    pub version: u64,
    pub major_rev: u64,
    pub minor_rev: u64,
}

impl KernelVersion {
    pub const fn new(version: u64, major_rev: u64, minor_rev: u64) -> Self {
        KernelVersion {
            version,
            major_rev,
            minor_rev,
        }
    }

    /// True if a kernel running at `self` meets the declared minimum `min_lts`:
    /// same version and major revision, minor revision at or above the floor.
    pub fn meets_min_lts(&self, min_lts: &KernelVersion) -> bool {
        self.version == min_lts.version
            && self.major_rev == min_lts.major_rev
            && self.minor_rev >= min_lts.minor_rev
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.version, self.major_rev, self.minor_rev)
    }
}

impl FromStr for KernelVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionParseError(s.to_string()));
        }
        let parse = |p: &str| p.parse::<u64>().map_err(|_| VersionParseError(s.to_string()));
        Ok(KernelVersion::new(
            parse(parts[0])?,
            parse(parts[1])?,
            parse(parts[2])?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meets_min_lts() {
        let min = KernelVersion::new(3, 18, 22);
        assert!(KernelVersion::new(3, 18, 22).meets_min_lts(&min));
        assert!(KernelVersion::new(3, 18, 40).meets_min_lts(&min));
        assert!(!KernelVersion::new(3, 18, 21).meets_min_lts(&min));
        // A different release line never matches, even if numerically higher.
        assert!(!KernelVersion::new(4, 4, 0).meets_min_lts(&min));
        assert!(!KernelVersion::new(3, 10, 73).meets_min_lts(&min));
    }

    #[test]
    fn test_parse_display() {
        let v: KernelVersion = "4.14.78".parse().unwrap();
        assert_eq!(v, KernelVersion::new(4, 14, 78));
        assert_eq!(v.to_string(), "4.14.78");
        assert!("4.14".parse::<KernelVersion>().is_err());
        assert!("4.14.x".parse::<KernelVersion>().is_err());
    }
}
