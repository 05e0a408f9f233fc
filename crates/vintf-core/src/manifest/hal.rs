//! One inventory entry of a manifest

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use vintf_version::{Version, DEFAULT_AIDL_MINOR_VERSION};

use crate::error::{Result, VintfError};
use crate::fqinstance::FqInstance;
use crate::manifest::ManifestInstance;
use crate::types::{HalFormat, Transport, TransportArch};

/// One named interface family provided by a manifest: its declared versions
/// and the set of instances it exposes.
///
/// Instances declared as interface/instance pairs (applied across every
/// declared version) and instances declared as fully-qualified shorthand both
/// normalize into the same [`ManifestInstance`] identity set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestHal {
    pub format: HalFormat,
    pub name: String,
    pub transport_arch: TransportArch,
    versions: Vec<Version>,
    instances: BTreeSet<ManifestInstance>,
    is_override: bool,
    updatable_via_apex: Option<String>,
    updatable_via_system: bool,
    accessor: Option<String>,
}

impl ManifestHal {
    pub fn new(
        format: HalFormat,
        name: impl Into<String>,
        transport_arch: TransportArch,
        versions: Vec<Version>,
    ) -> Self {
        let versions = if format == HalFormat::Aidl && versions.is_empty() {
            vec![Version::from_aidl(DEFAULT_AIDL_MINOR_VERSION)]
        } else {
            versions
        };
        ManifestHal {
            format,
            name: name.into(),
            transport_arch,
            versions,
            instances: BTreeSet::new(),
            is_override: false,
            updatable_via_apex: None,
            updatable_via_system: false,
            accessor: None,
        }
    }

    pub fn with_override(mut self, is_override: bool) -> Self {
        self.is_override = is_override;
        self
    }

    pub fn with_updatable_via_apex(mut self, apex: impl Into<String>) -> Self {
        self.updatable_via_apex = Some(apex.into());
        self
    }

    pub fn with_updatable_via_system(mut self, updatable: bool) -> Self {
        self.updatable_via_system = updatable;
        self
    }

    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = Some(accessor.into());
        self
    }

    pub fn is_override(&self) -> bool {
        self.is_override
    }

    pub fn updatable_via_apex(&self) -> Option<&str> {
        self.updatable_via_apex.as_deref()
    }

    pub fn updatable_via_system(&self) -> bool {
        self.updatable_via_system
    }

    pub fn accessor(&self) -> Option<&str> {
        self.accessor.as_deref()
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn instances(&self) -> &BTreeSet<ManifestInstance> {
        &self.instances
    }

    /// Declare an interface/instance pair, exposed at every declared version.
    pub fn add_instance(&mut self, interface: &str, instance: &str) {
        for &version in &self.versions {
            self.instances.insert(ManifestInstance::new(
                self.name.as_str(),
                version,
                interface,
                instance,
                self.transport_arch.clone(),
                self.format,
                self.updatable_via_apex.clone(),
                self.accessor.clone(),
                self.updatable_via_system,
            ));
        }
    }

    /// Declare an instance by fully-qualified shorthand. The package, when
    /// present, must match the entry name; singly-versioned interfaces may
    /// omit the version, which then defaults to the entry's declared version.
    pub fn add_fq_instance(&mut self, fq: &FqInstance) -> Result<()> {
        if fq.has_package() && fq.package() != self.name {
            return Err(VintfError::InvalidHal {
                name: self.name.clone(),
                reason: format!("instance {} names a different package", fq),
            });
        }
        let version = match (fq.version(), self.format) {
            (Some(v), _) => v,
            (None, HalFormat::Aidl) => self
                .versions
                .first()
                .copied()
                .unwrap_or(Version::from_aidl(DEFAULT_AIDL_MINOR_VERSION)),
            (None, _) => {
                return Err(VintfError::InvalidHal {
                    name: self.name.clone(),
                    reason: format!("instance {} has no version", fq),
                });
            }
        };
        self.instances.insert(ManifestInstance::new(
            self.name.as_str(),
            version,
            fq.interface(),
            fq.instance(),
            self.transport_arch.clone(),
            self.format,
            self.updatable_via_apex.clone(),
            self.accessor.clone(),
            self.updatable_via_system,
        ));
        Ok(())
    }

    /// Structural validity of one entry.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| {
            Err(VintfError::InvalidHal {
                name: self.name.clone(),
                reason,
            })
        };
        if self.name.is_empty() {
            return invalid("empty name".to_string());
        }
        if !self.transport_arch.is_valid() {
            return invalid(format!(
                "invalid transport/arch \"{}\"",
                self.transport_arch
            ));
        }
        match self.format {
            HalFormat::Hidl => {
                if self.transport_arch.transport == Transport::Empty {
                    return invalid("hidl HAL must specify transport".to_string());
                }
            }
            HalFormat::Aidl => {
                if !matches!(
                    self.transport_arch.transport,
                    Transport::Empty | Transport::Inet
                ) {
                    return invalid(format!(
                        "aidl HAL cannot use transport \"{}\"",
                        self.transport_arch.transport
                    ));
                }
            }
            HalFormat::Native => {
                if self.transport_arch.transport != Transport::Empty {
                    return invalid("native HAL must not specify transport".to_string());
                }
            }
        }
        // No two declared versions may share a major line.
        for (i, a) in self.versions.iter().enumerate() {
            for b in &self.versions[i + 1..] {
                if a.major == b.major {
                    return invalid(format!("conflicting major versions {} and {}", a, b));
                }
            }
        }
        Ok(())
    }

    /// Visit every provided instance; stops and returns false when the
    /// callback does.
    pub fn for_each_instance(&self, mut f: impl FnMut(&ManifestInstance) -> bool) -> bool {
        for instance in &self.instances {
            if !f(instance) {
                return false;
            }
        }
        true
    }

    /// All versions this entry touches: the declared list plus every instance
    /// version.
    pub fn all_versions(&self) -> BTreeSet<Version> {
        let mut versions: BTreeSet<Version> = self.versions.iter().copied().collect();
        versions.extend(self.instances.iter().map(|i| i.version()));
        versions
    }

    /// Major version lines this entry touches.
    pub fn majors(&self) -> BTreeSet<u64> {
        self.all_versions().iter().map(|v| v.major).collect()
    }

    /// Drop every declared version and instance on the given major lines.
    /// Used when an override entry supersedes those lines.
    pub(crate) fn retain_excluding_majors(&mut self, majors: &BTreeSet<u64>) {
        self.versions.retain(|v| !majors.contains(&v.major));
        self.instances.retain(|i| !majors.contains(&i.version().major));
    }

    /// True when nothing is declared anymore (after override pruning).
    pub(crate) fn is_empty(&self) -> bool {
        self.versions.is_empty() && self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Arch;

    fn hwbinder() -> TransportArch {
        TransportArch::new(Transport::HwBinder, Arch::Empty)
    }

    #[test]
    fn test_add_instance_crosses_versions() {
        let mut hal = ManifestHal::new(
            HalFormat::Hidl,
            "android.hardware.foo",
            hwbinder(),
            vec![Version::new(1, 3), Version::new(2, 4)],
        );
        hal.add_instance("IFoo", "slot1");
        let descriptions: Vec<String> =
            hal.instances().iter().map(|i| i.description()).collect();
        assert_eq!(
            descriptions,
            vec![
                "android.hardware.foo@1.3::IFoo/slot1",
                "android.hardware.foo@2.4::IFoo/slot1",
            ]
        );
    }

    #[test]
    fn test_add_fq_instance() {
        let mut hal = ManifestHal::new(
            HalFormat::Hidl,
            "android.hardware.foo",
            hwbinder(),
            vec![],
        );
        hal.add_fq_instance(&"@1.1::IFoo/slot2".parse().unwrap()).unwrap();
        hal.add_fq_instance(&"@3.1::IFoo/slot2".parse().unwrap()).unwrap();
        assert_eq!(hal.all_versions().len(), 2);
        assert_eq!(hal.majors(), [1, 3].into_iter().collect());

        // Package mismatch is rejected.
        assert!(hal
            .add_fq_instance(&"android.hardware.bar@1.0::IBar/x".parse().unwrap())
            .is_err());
        // A versionless instance only works for singly-versioned formats.
        assert!(hal.add_fq_instance(&"IFoo/default".parse().unwrap()).is_err());
    }

    #[test]
    fn test_aidl_defaults() {
        let mut hal = ManifestHal::new(
            HalFormat::Aidl,
            "android.hardware.light",
            TransportArch::default(),
            vec![],
        );
        assert_eq!(
            hal.versions(),
            &[Version::from_aidl(DEFAULT_AIDL_MINOR_VERSION)]
        );
        hal.add_fq_instance(&"ILights/default".parse().unwrap()).unwrap();
        let instance = hal.instances().iter().next().unwrap();
        assert_eq!(
            instance.version(),
            Version::from_aidl(DEFAULT_AIDL_MINOR_VERSION)
        );
    }

    #[test]
    fn test_validate_major_collision() {
        let hal = ManifestHal::new(
            HalFormat::Hidl,
            "android.hardware.foo",
            hwbinder(),
            vec![Version::new(1, 3), Version::new(1, 4)],
        );
        assert!(hal.validate().is_err());

        let ok = ManifestHal::new(
            HalFormat::Hidl,
            "android.hardware.foo",
            hwbinder(),
            vec![Version::new(1, 3), Version::new(2, 4)],
        );
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_validate_transport() {
        let hal = ManifestHal::new(
            HalFormat::Hidl,
            "android.hardware.foo",
            TransportArch::default(),
            vec![Version::new(1, 0)],
        );
        assert!(hal.validate().is_err());

        let aidl = ManifestHal::new(
            HalFormat::Aidl,
            "android.hardware.light",
            TransportArch::default(),
            vec![],
        );
        assert!(aidl.validate().is_ok());
    }

    #[test]
    fn test_retain_excluding_majors() {
        let mut hal = ManifestHal::new(
            HalFormat::Hidl,
            "android.hardware.foo",
            hwbinder(),
            vec![Version::new(1, 3), Version::new(2, 4)],
        );
        hal.add_instance("IFoo", "slot1");
        hal.retain_excluding_majors(&[1, 3].into_iter().collect());
        assert_eq!(hal.versions(), &[Version::new(2, 4)]);
        assert_eq!(hal.instances().len(), 1);
        assert!(!hal.is_empty());

        hal.retain_excluding_majors(&[2].into_iter().collect());
        assert!(hal.is_empty());
    }
}
