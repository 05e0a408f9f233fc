//! Fully-qualified instance identity

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vintf_version::Version;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid fully-qualified instance: {0:?}")]
pub struct FqInstanceParseError(pub String);

/// The canonical identity of one realizable interface surface: package,
/// version, interface name and instance name.
///
/// The interface may be empty for native HALs that expose a bare
/// `package@version`. The version is absent only in the simple
/// `Interface/instance` form used by singly-versioned interfaces.
/// Immutable value type with a total order, usable as a set or map key.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FqInstance {
    package: String,
    version: Option<Version>,
    interface: String,
    instance: String,
}

impl FqInstance {
    pub fn new(
        package: impl Into<String>,
        version: Version,
        interface: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        FqInstance {
            package: package.into(),
            version: Some(version),
            interface: interface.into(),
            instance: instance.into(),
        }
    }

    /// The package-relative form `@version::Interface/instance`.
    pub fn without_package(
        version: Version,
        interface: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        FqInstance::new("", version, interface, instance)
    }

    /// The simple `Interface/instance` form with no version.
    pub fn unversioned(interface: impl Into<String>, instance: impl Into<String>) -> Self {
        FqInstance {
            package: String::new(),
            version: None,
            interface: interface.into(),
            instance: instance.into(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn has_package(&self) -> bool {
        !self.package.is_empty()
    }

    pub fn has_version(&self) -> bool {
        self.version.is_some()
    }

    /// The same identity with the package replaced.
    pub fn with_package(&self, package: impl Into<String>) -> Self {
        FqInstance {
            package: package.into(),
            ..self.clone()
        }
    }

    /// The same identity with the version replaced.
    pub fn with_version(&self, version: Version) -> Self {
        FqInstance {
            version: Some(version),
            ..self.clone()
        }
    }
}

impl fmt::Display for FqInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut prefixed = false;
        if !self.package.is_empty() {
            write!(f, "{}", self.package)?;
            prefixed = true;
        }
        if let Some(v) = self.version {
            write!(f, "@{}", v)?;
            prefixed = true;
        }
        if !self.interface.is_empty() {
            if prefixed {
                write!(f, "::")?;
            }
            write!(f, "{}", self.interface)?;
        }
        if !self.instance.is_empty() {
            write!(f, "/{}", self.instance)?;
        }
        Ok(())
    }
}

impl FromStr for FqInstance {
    type Err = FqInstanceParseError;

    /// Parses `package@maj.min::Interface/instance` and its documented
    /// reductions: package-less (`@maj.min::Interface/instance`),
    /// interface-less (`package@maj.min`), and versionless
    /// (`Interface/instance`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(FqInstanceParseError(s.to_string()));
        }
        let err = || FqInstanceParseError(s.to_string());

        let (head, instance) = match s.split_once('/') {
            Some((head, instance)) if !instance.is_empty() => (head, instance.to_string()),
            Some(_) => return Err(err()),
            None => (s, String::new()),
        };

        if let Some((addr, interface)) = head.split_once("::") {
            let (package, version) = addr.split_once('@').ok_or_else(err)?;
            let version: Version = version.parse().map_err(|_| err())?;
            if interface.is_empty() {
                return Err(err());
            }
            Ok(FqInstance {
                package: package.to_string(),
                version: Some(version),
                interface: interface.to_string(),
                instance,
            })
        } else if let Some((package, version)) = head.split_once('@') {
            if package.is_empty() {
                return Err(err());
            }
            let version: Version = version.parse().map_err(|_| err())?;
            Ok(FqInstance {
                package: package.to_string(),
                version: Some(version),
                interface: String::new(),
                instance,
            })
        } else {
            // Versionless Interface/instance form.
            if instance.is_empty() {
                return Err(err());
            }
            Ok(FqInstance {
                package: String::new(),
                version: None,
                interface: head.to_string(),
                instance,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            FqInstance::new("android.hardware.foo", Version::new(1, 2), "IFoo", "default")
                .to_string(),
            "android.hardware.foo@1.2::IFoo/default"
        );
        assert_eq!(
            FqInstance::without_package(Version::new(1, 1), "IFoo", "slot2").to_string(),
            "@1.1::IFoo/slot2"
        );
        assert_eq!(
            FqInstance::unversioned("IFoo", "default").to_string(),
            "IFoo/default"
        );
        // Native HALs may have no interface or instance.
        assert_eq!(
            FqInstance::new("netutils-wrapper", Version::new(1, 0), "", "").to_string(),
            "netutils-wrapper@1.0"
        );
    }

    #[test]
    fn test_parse_full() {
        let fq: FqInstance = "android.hardware.foo@1.2::IFoo/default".parse().unwrap();
        assert_eq!(fq.package(), "android.hardware.foo");
        assert_eq!(fq.version(), Some(Version::new(1, 2)));
        assert_eq!(fq.interface(), "IFoo");
        assert_eq!(fq.instance(), "default");
    }

    #[test]
    fn test_parse_reduced_forms() {
        let fq: FqInstance = "@1.1::IFoo/slot2".parse().unwrap();
        assert!(!fq.has_package());
        assert_eq!(fq.version(), Some(Version::new(1, 1)));

        let fq: FqInstance = "IFoo/default".parse().unwrap();
        assert!(!fq.has_version());
        assert_eq!(fq.interface(), "IFoo");
        assert_eq!(fq.instance(), "default");

        let fq: FqInstance = "netutils-wrapper@1.0".parse().unwrap();
        assert_eq!(fq.package(), "netutils-wrapper");
        assert_eq!(fq.interface(), "");
        assert_eq!(fq.instance(), "");
    }

    #[test]
    fn test_parse_rejects() {
        assert!("".parse::<FqInstance>().is_err());
        assert!("foo@bar::IFoo/default".parse::<FqInstance>().is_err());
        assert!("@1.2::/default".parse::<FqInstance>().is_err());
        assert!("IFoo/".parse::<FqInstance>().is_err());
    }

    #[test]
    fn test_roundtrip() {
        for s in [
            "android.hardware.foo@1.2::IFoo/default",
            "@1.1::IFoo/slot2",
            "IFoo/default",
            "netutils-wrapper@1.0",
        ] {
            assert_eq!(s.parse::<FqInstance>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_ordering() {
        let a: FqInstance = "a@1.0::I/x".parse().unwrap();
        let b: FqInstance = "a@1.1::I/x".parse().unwrap();
        let c: FqInstance = "b@1.0::I/x".parse().unwrap();
        assert!(a < b);
        assert!(b < c);
    }
}
