//! One required interface instance, exact or pattern-matched

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use vintf_version::VersionRange;

use crate::error::VintfError;
use crate::fqinstance::FqInstance;
use crate::manifest::ManifestInstance;
use crate::types::HalFormat;

/// A validated instance-name pattern, compiled once at construction and never
/// mutated. Matching is anchored: the pattern must cover the whole name.
#[derive(Debug, Clone)]
pub struct InstanceRegex {
    pattern: String,
    regex: Regex,
}

impl InstanceRegex {
    pub fn new(pattern: &str) -> Result<Self, VintfError> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
            VintfError::MalformedPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(InstanceRegex {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, instance: &str) -> bool {
        self.regex.is_match(instance)
    }
}

impl PartialEq for InstanceRegex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for InstanceRegex {}

impl PartialOrd for InstanceRegex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstanceRegex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pattern.cmp(&other.pattern)
    }
}

impl Hash for InstanceRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pattern.hash(state);
    }
}

impl Serialize for InstanceRegex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pattern)
    }
}

impl<'de> Deserialize<'de> for InstanceRegex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        InstanceRegex::new(&pattern).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for InstanceRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

/// An instance name requirement: either an exact name or a pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstancePattern {
    Exact(String),
    Regex(InstanceRegex),
}

impl InstancePattern {
    pub fn is_regex(&self) -> bool {
        matches!(self, InstancePattern::Regex(_))
    }

    /// The exact name or the pattern source.
    pub fn text(&self) -> &str {
        match self {
            InstancePattern::Exact(name) => name,
            InstancePattern::Regex(regex) => regex.pattern(),
        }
    }

    pub fn matches(&self, instance: &str) -> bool {
        match self {
            InstancePattern::Exact(name) => name == instance,
            InstancePattern::Regex(regex) => regex.matches(instance),
        }
    }
}

/// One expanded requirement leaf: a (version range × interface × instance)
/// combination of a matrix HAL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixInstance {
    package: String,
    version_range: VersionRange,
    interface: String,
    instance: InstancePattern,
    optional: bool,
    format: HalFormat,
}

impl MatrixInstance {
    pub fn new(
        package: impl Into<String>,
        version_range: VersionRange,
        interface: impl Into<String>,
        instance: InstancePattern,
        optional: bool,
        format: HalFormat,
    ) -> Self {
        MatrixInstance {
            package: package.into(),
            version_range,
            interface: interface.into(),
            instance,
            optional,
            format,
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn version_range(&self) -> VersionRange {
        self.version_range
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn optional(&self) -> bool {
        self.optional
    }

    pub fn format(&self) -> HalFormat {
        self.format
    }

    pub fn is_regex(&self) -> bool {
        self.instance.is_regex()
    }

    /// The exact instance name; empty when this leaf is a pattern.
    pub fn exact_instance(&self) -> Option<&str> {
        match &self.instance {
            InstancePattern::Exact(name) => Some(name),
            InstancePattern::Regex(_) => None,
        }
    }

    pub fn pattern(&self) -> &InstancePattern {
        &self.instance
    }

    pub fn matches_instance(&self, instance: &str) -> bool {
        self.instance.matches(instance)
    }

    /// Whether a provided identity satisfies this leaf: same package and
    /// interface, instance name matching, and a provided version at or above
    /// the range floor.
    pub fn is_satisfied_by(&self, provided: &FqInstance) -> bool {
        let Some(version) = provided.version() else {
            return false;
        };
        self.package == provided.package()
            && self.version_range.supported_by(&version)
            && self.interface == provided.interface()
            && self.matches_instance(provided.instance())
    }

    /// Convenience over [`is_satisfied_by`](Self::is_satisfied_by) for a full
    /// provided instance.
    pub fn is_satisfied_by_manifest_instance(&self, provided: &ManifestInstance) -> bool {
        self.is_satisfied_by(&provided.fq_instance())
    }

    /// Render this leaf for diagnostics, format-appropriately.
    pub fn description(&self) -> String {
        match self.format {
            HalFormat::Aidl => {
                let mut s = self.interface.clone();
                if !self.instance.text().is_empty() {
                    s.push('/');
                    s.push_str(self.instance.text());
                }
                format!("{} (@{})", s, self.version_range.to_aidl_string())
            }
            HalFormat::Hidl | HalFormat::Native => {
                let mut s = format!("@{}", self.version_range);
                if !self.interface.is_empty() {
                    s.push_str("::");
                    s.push_str(&self.interface);
                }
                if !self.instance.text().is_empty() {
                    s.push('/');
                    s.push_str(self.instance.text());
                }
                s
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_regex_anchored() {
        let regex = InstanceRegex::new("legacy/[0-9]+").unwrap();
        assert!(regex.matches("legacy/0"));
        assert!(regex.matches("legacy/14"));
        assert!(!regex.matches("legacy0"));
        assert!(!regex.matches("legacy/0x"));
        assert!(!regex.matches("xlegacy/0"));
    }

    #[test]
    fn test_instance_regex_rejects_malformed() {
        assert!(matches!(
            InstanceRegex::new("legacy/["),
            Err(VintfError::MalformedPattern { .. })
        ));
    }

    #[test]
    fn test_is_satisfied_by() {
        let leaf = MatrixInstance::new(
            "android.hardware.foo",
            VersionRange::new(1, 2, 3),
            "IFoo",
            InstancePattern::Exact("default".to_string()),
            false,
            HalFormat::Hidl,
        );

        let fq = |s: &str| s.parse::<FqInstance>().unwrap();
        assert!(!leaf.is_satisfied_by(&fq("android.hardware.foo@1.0::IFoo/default")));
        assert!(leaf.is_satisfied_by(&fq("android.hardware.foo@1.2::IFoo/default")));
        assert!(leaf.is_satisfied_by(&fq("android.hardware.foo@1.3::IFoo/default")));
        // Above the ceiling is still a match; the floor decides.
        assert!(leaf.is_satisfied_by(&fq("android.hardware.foo@1.7::IFoo/default")));
        assert!(!leaf.is_satisfied_by(&fq("android.hardware.foo@2.2::IFoo/default")));
        assert!(!leaf.is_satisfied_by(&fq("android.hardware.foo@1.2::IFoo/other")));
        assert!(!leaf.is_satisfied_by(&fq("android.hardware.bar@1.2::IFoo/default")));
    }

    #[test]
    fn test_description() {
        let hidl = MatrixInstance::new(
            "android.hardware.foo",
            VersionRange::new(1, 2, 3),
            "IFoo",
            InstancePattern::Exact("default".to_string()),
            false,
            HalFormat::Hidl,
        );
        assert_eq!(hidl.description(), "@1.2-3::IFoo/default");

        let aidl = MatrixInstance::new(
            "android.hardware.light",
            VersionRange::from_aidl(1, 2),
            "ILights",
            InstancePattern::Exact("default".to_string()),
            false,
            HalFormat::Aidl,
        );
        assert_eq!(aidl.description(), "ILights/default (@1-2)");

        let native = MatrixInstance::new(
            "netutils-wrapper",
            VersionRange::single(1, 0),
            "",
            InstancePattern::Exact(String::new()),
            false,
            HalFormat::Native,
        );
        assert_eq!(native.description(), "@1.0");
    }
}
