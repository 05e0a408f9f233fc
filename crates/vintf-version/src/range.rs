//! Minor-version ranges within a single major line

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::version::{SepolicyVersion, Version, VersionParseError};

/// A range of minor versions within one major line, e.g. `2.3-7`.
///
/// Invariant: `min_minor <= max_minor`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VersionRange {
    pub major: u64,
    pub min_minor: u64,
    pub max_minor: u64,
}

impl VersionRange {
    pub const fn new(major: u64, min_minor: u64, max_minor: u64) -> Self {
        VersionRange {
            major,
            min_minor,
            max_minor,
        }
    }

    /// A range covering exactly one version.
    pub const fn single(major: u64, minor: u64) -> Self {
        VersionRange::new(major, minor, minor)
    }

    /// A range of AIDL version numbers, stored under the fake major line.
    pub const fn from_aidl(min_minor: u64, max_minor: u64) -> Self {
        VersionRange::new(crate::FAKE_AIDL_MAJOR_VERSION, min_minor, max_minor)
    }

    pub fn min_ver(&self) -> Version {
        Version::new(self.major, self.min_minor)
    }

    pub fn max_ver(&self) -> Version {
        Version::new(self.major, self.max_minor)
    }

    pub fn is_single_version(&self) -> bool {
        self.min_minor == self.max_minor
    }

    /// True if `ver` lies within the range bounds.
    pub fn contains(&self, ver: &Version) -> bool {
        self.min_ver() <= *ver && *ver <= self.max_ver()
    }

    /// True if an installed `ver` satisfies this range.
    ///
    /// Only the floor is checked: if this == 2.3-7,
    ///     ver == 2.2: false
    ///     ver == 2.3: true
    ///     ver == 2.7: true
    ///     ver == 2.8: true
    /// The ceiling records what existed when the range was authored; a newer
    /// minor is still backward compatible.
    pub fn supported_by(&self, ver: &Version) -> bool {
        self.major == ver.major && self.min_minor <= ver.minor
    }

    /// True if the ranges share a major line and intersect.
    /// `a.overlaps(b)` iff `b.overlaps(a)`.
    pub fn overlaps(&self, other: &VersionRange) -> bool {
        self.major == other.major
            && self.min_minor <= other.max_minor
            && other.min_minor <= self.max_minor
    }

    /// Render the AIDL form: a bare minor or `min-max`.
    pub fn to_aidl_string(&self) -> String {
        if self.is_single_version() {
            self.min_minor.to_string()
        } else {
            format!("{}-{}", self.min_minor, self.max_minor)
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_version() {
            write!(f, "{}", self.min_ver())
        } else {
            write!(f, "{}-{}", self.min_ver(), self.max_minor)
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionParseError;

    /// Parses `maj.min` (single version) or `maj.min-maxMinor`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            None => {
                let v: Version = s.parse()?;
                Ok(VersionRange::single(v.major, v.minor))
            }
            Some((min, max)) => {
                let v: Version = min.parse()?;
                let max_minor: u64 = max.parse().map_err(|_| VersionParseError(s.to_string()))?;
                if max_minor < v.minor {
                    return Err(VersionParseError(s.to_string()));
                }
                Ok(VersionRange::new(v.major, v.minor, max_minor))
            }
        }
    }
}

impl From<Version> for VersionRange {
    fn from(v: Version) -> Self {
        VersionRange::single(v.major, v.minor)
    }
}

/// A sepolicy version range. An unset `max_minor` means unbounded above;
/// an unset `min_minor` means unbounded below.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SepolicyVersionRange {
    pub major: u64,
    pub min_minor: Option<u64>,
    pub max_minor: Option<u64>,
}

impl SepolicyVersionRange {
    pub const fn new(major: u64, min_minor: Option<u64>, max_minor: Option<u64>) -> Self {
        SepolicyVersionRange {
            major,
            min_minor,
            max_minor,
        }
    }

    pub fn min_ver(&self) -> SepolicyVersion {
        SepolicyVersion::new(self.major, self.min_minor)
    }

    pub fn max_ver(&self) -> SepolicyVersion {
        SepolicyVersion::new(self.major, self.max_minor)
    }

    pub fn is_single_version(&self) -> bool {
        self.min_minor == self.max_minor
    }

    /// Floor-only check, same direction as [`VersionRange::supported_by`].
    /// `None` compares below any concrete minor, so an unbounded floor
    /// accepts every minor of the right major.
    pub fn supported_by(&self, ver: &SepolicyVersion) -> bool {
        self.major == ver.major && self.min_minor <= ver.minor
    }
}

impl fmt::Display for SepolicyVersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_minor {
            Some(max) => write!(
                f,
                "{}",
                VersionRange::new(self.major, self.min_minor.unwrap_or(0), max)
            ),
            None => write!(f, "{}", SepolicyVersion::new(self.major, self.min_minor)),
        }
    }
}

impl FromStr for SepolicyVersionRange {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(v) = s.parse::<SepolicyVersion>() {
            return Ok(SepolicyVersionRange::new(v.major, v.minor, v.minor));
        }
        let vr: VersionRange = s.parse()?;
        Ok(SepolicyVersionRange::new(
            vr.major,
            Some(vr.min_minor),
            Some(vr.max_minor),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let r = VersionRange::new(2, 3, 7);
        assert!(!r.contains(&Version::new(2, 2)));
        assert!(r.contains(&Version::new(2, 3)));
        assert!(r.contains(&Version::new(2, 5)));
        assert!(r.contains(&Version::new(2, 7)));
        assert!(!r.contains(&Version::new(2, 8)));
        assert!(!r.contains(&Version::new(1, 5)));
        assert!(!r.contains(&Version::new(3, 5)));
    }

    #[test]
    fn test_supported_by_checks_floor_only() {
        let r = VersionRange::new(2, 3, 7);
        assert!(!r.supported_by(&Version::new(2, 2)));
        assert!(r.supported_by(&Version::new(2, 3)));
        assert!(r.supported_by(&Version::new(2, 7)));
        // Above the ceiling still satisfies: the ceiling is descriptive.
        assert!(r.supported_by(&Version::new(2, 8)));
        assert!(!r.supported_by(&Version::new(3, 3)));

        // Independence from the ceiling, explicitly.
        let narrow = VersionRange::new(2, 3, 3);
        let wide = VersionRange::new(2, 3, 100);
        for minor in 0..12 {
            let v = Version::new(2, minor);
            assert_eq!(narrow.supported_by(&v), wide.supported_by(&v));
        }
    }

    #[test]
    fn test_overlaps() {
        let a = VersionRange::new(1, 2, 4);
        assert!(!a.overlaps(&VersionRange::new(2, 2, 4)));
        assert!(a.overlaps(&VersionRange::new(1, 4, 5)));
        assert!(!a.overlaps(&VersionRange::new(1, 0, 1)));
        assert!(a.overlaps(&VersionRange::new(1, 0, 2)));
    }

    #[test]
    fn test_overlaps_symmetric() {
        let ranges = [
            VersionRange::new(1, 0, 1),
            VersionRange::new(1, 1, 3),
            VersionRange::new(1, 4, 9),
            VersionRange::new(2, 0, 5),
        ];
        for a in &ranges {
            for b in &ranges {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_parse_display() {
        let r: VersionRange = "1.2-3".parse().unwrap();
        assert_eq!(r, VersionRange::new(1, 2, 3));
        assert_eq!(r.to_string(), "1.2-3");

        let single: VersionRange = "4.5".parse().unwrap();
        assert_eq!(single, VersionRange::single(4, 5));
        assert_eq!(single.to_string(), "4.5");

        assert!("1.5-2".parse::<VersionRange>().is_err()); // max below min
        assert!("1".parse::<VersionRange>().is_err());
    }

    #[test]
    fn test_aidl_range_string() {
        assert_eq!(VersionRange::from_aidl(2, 2).to_aidl_string(), "2");
        assert_eq!(VersionRange::from_aidl(1, 3).to_aidl_string(), "1-3");
    }

    #[test]
    fn test_sepolicy_range_supported_by() {
        // Unbounded floor accepts any minor of the right major.
        let open = SepolicyVersionRange::new(202404, None, None);
        assert!(open.supported_by(&SepolicyVersion::new(202404, None)));
        assert!(open.supported_by(&SepolicyVersion::new(202404, Some(3))));
        assert!(!open.supported_by(&SepolicyVersion::new(202504, None)));

        let floored = SepolicyVersionRange::new(30, Some(1), Some(2));
        assert!(!floored.supported_by(&SepolicyVersion::new(30, Some(0))));
        assert!(floored.supported_by(&SepolicyVersion::new(30, Some(1))));
        assert!(floored.supported_by(&SepolicyVersion::new(30, Some(9))));
        // A bare-major version cannot satisfy a concrete floor.
        assert!(!floored.supported_by(&SepolicyVersion::new(30, None)));
    }

    #[test]
    fn test_sepolicy_range_parse_display() {
        assert_eq!(
            "202404".parse::<SepolicyVersionRange>().unwrap(),
            SepolicyVersionRange::new(202404, None, None)
        );
        assert_eq!(
            "30.0".parse::<SepolicyVersionRange>().unwrap(),
            SepolicyVersionRange::new(30, Some(0), Some(0))
        );
        assert_eq!(
            "30.0-2".parse::<SepolicyVersionRange>().unwrap(),
            SepolicyVersionRange::new(30, Some(0), Some(2))
        );
        assert_eq!(
            SepolicyVersionRange::new(30, Some(0), Some(2)).to_string(),
            "30.0-2"
        );
        assert_eq!(
            SepolicyVersionRange::new(202404, None, None).to_string(),
            "202404"
        );
    }
}
