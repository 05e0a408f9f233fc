//! One requirement entry of a compatibility matrix

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use vintf_version::{Version, VersionRange};

use crate::error::{Result, VintfError};
use crate::fqinstance::FqInstance;
use crate::matrix::instance::{InstancePattern, InstanceRegex, MatrixInstance};
use crate::types::{HalFormat, Level};

/// The instances a matrix HAL requires of one interface: exact names plus
/// validated name patterns.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixInterface {
    instances: BTreeSet<String>,
    regexes: Vec<InstanceRegex>,
}

impl MatrixInterface {
    pub fn instances(&self) -> &BTreeSet<String> {
        &self.instances
    }

    pub fn regexes(&self) -> &[InstanceRegex] {
        &self.regexes
    }

    fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.regexes.is_empty()
    }
}

/// One named interface family required by a compatibility matrix: the
/// acceptable version ranges and the interface/instance combinations that
/// must be provided.
///
/// Version ranges never overlap within one entry;
/// [`insert_version_ranges`](MatrixHal::insert_version_ranges) extends an
/// existing overlapping range instead of inserting a second one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixHal {
    pub format: HalFormat,
    pub name: String,
    version_ranges: Vec<VersionRange>,
    optional: bool,
    #[serde(default)]
    updatable_via_apex: bool,
    #[serde(default)]
    min_level: Level,
    #[serde(default)]
    max_level: Level,
    interfaces: BTreeMap<String, MatrixInterface>,
}

impl MatrixHal {
    pub fn new(
        format: HalFormat,
        name: impl Into<String>,
        version_ranges: Vec<VersionRange>,
        optional: bool,
    ) -> Self {
        MatrixHal {
            format,
            name: name.into(),
            version_ranges,
            optional,
            updatable_via_apex: false,
            min_level: Level::UNSPECIFIED,
            max_level: Level::UNSPECIFIED,
            interfaces: BTreeMap::new(),
        }
    }

    pub fn with_updatable_via_apex(mut self, updatable: bool) -> Self {
        self.updatable_via_apex = updatable;
        self
    }

    /// Gate this requirement to manifests within [min, max] release levels.
    pub fn with_levels(mut self, min_level: Level, max_level: Level) -> Self {
        self.min_level = min_level;
        self.max_level = max_level;
        self
    }

    pub fn optional(&self) -> bool {
        self.optional
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.optional = optional;
    }

    pub fn updatable_via_apex(&self) -> bool {
        self.updatable_via_apex
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn max_level(&self) -> Level {
        self.max_level
    }

    pub fn version_ranges(&self) -> &[VersionRange] {
        &self.version_ranges
    }

    pub fn interfaces(&self) -> &BTreeMap<String, MatrixInterface> {
        &self.interfaces
    }

    /// Whether this requirement applies to a manifest at the given level.
    /// An unleveled manifest is checked against everything.
    pub fn applies_to_level(&self, manifest_level: Level) -> bool {
        if !manifest_level.is_specified() {
            return true;
        }
        if self.min_level.is_specified() && manifest_level < self.min_level {
            return false;
        }
        if self.max_level.is_specified() && manifest_level > self.max_level {
            return false;
        }
        true
    }

    pub fn contains_version(&self, version: &Version) -> bool {
        self.version_ranges.iter().any(|vr| vr.contains(version))
    }

    /// Require an exact interface/instance combination.
    pub fn add_instance(&mut self, interface: &str, instance: &str) {
        self.interfaces
            .entry(interface.to_string())
            .or_default()
            .instances
            .insert(instance.to_string());
    }

    /// Require every instance whose name matches a pattern. The pattern must
    /// compile and must not repeat within one interface.
    pub fn add_regex_instance(&mut self, interface: &str, pattern: &str) -> Result<()> {
        let regex = InstanceRegex::new(pattern)?;
        let entry = self.interfaces.entry(interface.to_string()).or_default();
        if entry.regexes.iter().any(|r| r.pattern() == pattern) {
            return Err(VintfError::DuplicatePattern {
                interface: interface.to_string(),
                pattern: pattern.to_string(),
            });
        }
        entry.regexes.push(regex);
        Ok(())
    }

    /// Exact instance names required of one interface.
    pub fn get_instances(&self, interface: &str) -> BTreeSet<String> {
        self.interfaces
            .get(interface)
            .map(|i| i.instances.clone())
            .unwrap_or_default()
    }

    /// True if this entry requires every interface/instance combination the
    /// other entry requires.
    pub fn contains_instances(&self, other: &MatrixHal) -> bool {
        other.interfaces.iter().all(|(name, theirs)| {
            self.interfaces.get(name).is_some_and(|ours| {
                theirs.instances.is_subset(&ours.instances)
                    && theirs
                        .regexes
                        .iter()
                        .all(|r| ours.regexes.iter().any(|o| o.pattern() == r.pattern()))
            })
        })
    }

    /// Every (interface, instance-or-pattern) combination of this entry.
    pub fn instance_entries(&self) -> Vec<(String, String, bool)> {
        let mut entries = Vec::new();
        for (interface, value) in &self.interfaces {
            for instance in &value.instances {
                entries.push((interface.clone(), instance.clone(), false));
            }
            for regex in &value.regexes {
                entries.push((interface.clone(), regex.pattern().to_string(), true));
            }
        }
        entries
    }

    pub fn has_instance(&self, interface: &str, text: &str, is_regex: bool) -> bool {
        self.interfaces.get(interface).is_some_and(|value| {
            if is_regex {
                value.regexes.iter().any(|r| r.pattern() == text)
            } else {
                value.instances.contains(text)
            }
        })
    }

    pub fn remove_instance(&mut self, interface: &str, text: &str, is_regex: bool) {
        if let Some(value) = self.interfaces.get_mut(interface) {
            if is_regex {
                value.regexes.retain(|r| r.pattern() != text);
            } else {
                value.instances.remove(text);
            }
            if value.is_empty() {
                self.interfaces.remove(interface);
            }
        }
    }

    pub fn has_any_instance(&self) -> bool {
        self.interfaces.values().any(|v| !v.is_empty())
    }

    pub fn instances_count(&self) -> usize {
        self.interfaces
            .values()
            .map(|v| v.instances.len() + v.regexes.len())
            .sum()
    }

    /// Split off one interface/instance combination into its own entry with
    /// the same versions and flags, so a version extension can target it
    /// alone. Returns None when this entry consists of exactly that
    /// combination already.
    pub(crate) fn split_instance(
        &mut self,
        interface: &str,
        text: &str,
        is_regex: bool,
    ) -> Option<MatrixHal> {
        if self.instances_count() <= 1 {
            return None;
        }
        self.remove_instance(interface, text, is_regex);
        let mut split = MatrixHal::new(
            self.format,
            self.name.as_str(),
            self.version_ranges.clone(),
            self.optional,
        )
        .with_updatable_via_apex(self.updatable_via_apex)
        .with_levels(self.min_level, self.max_level);
        if is_regex {
            // The pattern compiled when it was first added.
            split.add_regex_instance(interface, text).ok()?;
        } else {
            split.add_instance(interface, text);
        }
        Some(split)
    }

    /// Fold other ranges in, extending an overlapping range (floor = min,
    /// ceiling = max) rather than inserting a second range on the same major
    /// line segment.
    pub fn insert_version_ranges(&mut self, ranges: &[VersionRange]) {
        for other in ranges {
            match self.version_ranges.iter_mut().find(|vr| vr.overlaps(other)) {
                Some(existing) => {
                    existing.min_minor = existing.min_minor.min(other.min_minor);
                    existing.max_minor = existing.max_minor.max(other.max_minor);
                }
                None => self.version_ranges.push(*other),
            }
        }
    }

    /// Visit every (version range × interface × instance) leaf; stops and
    /// returns false when the callback does.
    pub fn for_each_instance(&self, mut f: impl FnMut(&MatrixInstance) -> bool) -> bool {
        for vr in &self.version_ranges {
            if !self.for_each_instance_of_range(vr, &mut f) {
                return false;
            }
        }
        true
    }

    /// Visit the leaves of one version range.
    pub fn for_each_instance_of_range(
        &self,
        vr: &VersionRange,
        mut f: impl FnMut(&MatrixInstance) -> bool,
    ) -> bool {
        for (interface, value) in &self.interfaces {
            for instance in &value.instances {
                let leaf = MatrixInstance::new(
                    self.name.as_str(),
                    *vr,
                    interface.as_str(),
                    InstancePattern::Exact(instance.clone()),
                    self.optional,
                    self.format,
                );
                if !f(&leaf) {
                    return false;
                }
            }
            for regex in &value.regexes {
                let leaf = MatrixInstance::new(
                    self.name.as_str(),
                    *vr,
                    interface.as_str(),
                    InstancePattern::Regex(regex.clone()),
                    self.optional,
                    self.format,
                );
                if !f(&leaf) {
                    return false;
                }
            }
        }
        true
    }

    /// Whether the provided instances satisfy this requirement.
    ///
    /// Version ranges are alternatives (OR); within one range, every declared
    /// interface/instance combination must be provided (AND). An entry that
    /// declares no instances at all falls back to version-only matching.
    pub fn is_compatible(
        &self,
        provided: &BTreeSet<FqInstance>,
        provided_versions: &BTreeSet<Version>,
    ) -> bool {
        self.version_ranges
            .iter()
            .any(|vr| self.is_compatible_at(vr, provided, provided_versions))
    }

    fn is_compatible_at(
        &self,
        vr: &VersionRange,
        provided: &BTreeSet<FqInstance>,
        provided_versions: &BTreeSet<Version>,
    ) -> bool {
        let mut has_any_instance = false;
        let mut unsatisfied = false;
        self.for_each_instance_of_range(vr, |leaf| {
            has_any_instance = true;
            if !provided.iter().any(|fq| leaf.is_satisfied_by(fq)) {
                unsatisfied = true;
            }
            !unsatisfied
        });
        if has_any_instance {
            return !unsatisfied;
        }
        // No instances declared (native HALs, some tests): versions decide.
        provided_versions.iter().any(|v| vr.supported_by(v))
    }

    /// Structural validity: non-empty name, pairwise non-overlapping ranges.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(VintfError::InvalidHal {
                name: String::new(),
                reason: "empty name".to_string(),
            });
        }
        for (i, a) in self.version_ranges.iter().enumerate() {
            for b in &self.version_ranges[i + 1..] {
                if a.overlaps(b) {
                    return Err(VintfError::InvalidHal {
                        name: self.name.clone(),
                        reason: format!("overlapping version ranges {} and {}", a, b),
                    });
                }
            }
        }
        Ok(())
    }
}
