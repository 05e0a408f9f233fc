//! One concrete provided interface instance

use std::fmt;

use serde::{Deserialize, Serialize};
use vintf_version::Version;

use crate::fqinstance::FqInstance;
use crate::types::{Arch, HalFormat, Transport, TransportArch};

/// A single provided instance: the fully-qualified identity plus how it is
/// reached and how it can be updated.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ManifestInstance {
    package: String,
    version: Version,
    interface: String,
    instance: String,
    transport_arch: TransportArch,
    format: HalFormat,
    updatable_via_apex: Option<String>,
    accessor: Option<String>,
    updatable_via_system: bool,
}

impl ManifestInstance {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        package: impl Into<String>,
        version: Version,
        interface: impl Into<String>,
        instance: impl Into<String>,
        transport_arch: TransportArch,
        format: HalFormat,
        updatable_via_apex: Option<String>,
        accessor: Option<String>,
        updatable_via_system: bool,
    ) -> Self {
        ManifestInstance {
            package: package.into(),
            version,
            interface: interface.into(),
            instance: instance.into(),
            transport_arch,
            format,
            updatable_via_apex,
            accessor,
            updatable_via_system,
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn transport(&self) -> Transport {
        self.transport_arch.transport
    }

    pub fn arch(&self) -> Arch {
        self.transport_arch.arch
    }

    pub fn ip(&self) -> Option<&str> {
        self.transport_arch.ip.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.transport_arch.port
    }

    pub fn format(&self) -> HalFormat {
        self.format
    }

    pub fn updatable_via_apex(&self) -> Option<&str> {
        self.updatable_via_apex.as_deref()
    }

    pub fn accessor(&self) -> Option<&str> {
        self.accessor.as_deref()
    }

    pub fn updatable_via_system(&self) -> bool {
        self.updatable_via_system
    }

    /// The full identity as an [`FqInstance`].
    pub fn fq_instance(&self) -> FqInstance {
        FqInstance::new(
            self.package.as_str(),
            self.version,
            self.interface.as_str(),
            self.instance.as_str(),
        )
    }

    /// The package-relative identity used by provided-instance shorthand:
    /// `Interface/instance` for singly-versioned interfaces,
    /// `@maj.min::Interface/instance` otherwise.
    pub fn simple_fq_string(&self) -> String {
        match self.format {
            HalFormat::Aidl => {
                FqInstance::unversioned(self.interface.as_str(), self.instance.as_str()).to_string()
            }
            HalFormat::Hidl | HalFormat::Native => FqInstance::without_package(
                self.version,
                self.interface.as_str(),
                self.instance.as_str(),
            )
            .to_string(),
        }
    }

    /// A format-appropriate human-readable rendering. Injective over distinct
    /// identities, so it doubles as a dedup key in diagnostics.
    pub fn description(&self) -> String {
        match self.format {
            HalFormat::Aidl => {
                let mut s = format!("{}.{}", self.package, self.interface);
                if !self.instance.is_empty() {
                    s.push('/');
                    s.push_str(&self.instance);
                }
                s.push_str(&format!(" (@{})", self.version.to_aidl_string()));
                s
            }
            HalFormat::Hidl | HalFormat::Native => self.fq_instance().to_string(),
        }
    }

    /// Like [`description`](Self::description) but package-relative.
    pub fn description_without_package(&self) -> String {
        match self.format {
            HalFormat::Aidl => {
                let mut s = self.interface.clone();
                if !self.instance.is_empty() {
                    s.push('/');
                    s.push_str(&self.instance);
                }
                s.push_str(&format!(" (@{})", self.version.to_aidl_string()));
                s
            }
            HalFormat::Hidl | HalFormat::Native => self.simple_fq_string(),
        }
    }

    /// The same instance at a different version.
    pub fn with_version(&self, version: Version) -> Self {
        ManifestInstance {
            version,
            ..self.clone()
        }
    }
}

impl fmt::Display for ManifestInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidl_instance() -> ManifestInstance {
        ManifestInstance::new(
            "android.hardware.foo",
            Version::new(1, 2),
            "IFoo",
            "default",
            TransportArch::new(Transport::HwBinder, Arch::Empty),
            HalFormat::Hidl,
            None,
            None,
            false,
        )
    }

    fn aidl_instance() -> ManifestInstance {
        ManifestInstance::new(
            "android.hardware.light",
            Version::from_aidl(2),
            "ILights",
            "default",
            TransportArch::default(),
            HalFormat::Aidl,
            Some("com.android.lights".to_string()),
            None,
            false,
        )
    }

    #[test]
    fn test_description_hidl() {
        assert_eq!(
            hidl_instance().description(),
            "android.hardware.foo@1.2::IFoo/default"
        );
        assert_eq!(
            hidl_instance().description_without_package(),
            "@1.2::IFoo/default"
        );
    }

    #[test]
    fn test_description_aidl() {
        assert_eq!(
            aidl_instance().description(),
            "android.hardware.light.ILights/default (@2)"
        );
        assert_eq!(
            aidl_instance().description_without_package(),
            "ILights/default (@2)"
        );
        assert_eq!(aidl_instance().simple_fq_string(), "ILights/default");
    }

    #[test]
    fn test_description_injective() {
        let a = aidl_instance();
        let b = a.with_version(Version::from_aidl(3));
        assert_ne!(a.description(), b.description());
    }

    #[test]
    fn test_with_version() {
        let v2 = hidl_instance().with_version(Version::new(1, 4));
        assert_eq!(v2.version(), Version::new(1, 4));
        assert_eq!(v2.package(), "android.hardware.foo");
        assert_eq!(v2.description(), "android.hardware.foo@1.4::IFoo/default");
    }
}
