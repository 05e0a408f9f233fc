//! Shared enums and small value types of the descriptor model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {what}: {value:?}")]
pub struct EnumParseError {
    pub what: &'static str,
    pub value: String,
}

/// The descriptor family a HAL entry belongs to. A closed set; all
/// format-specific rendering and identity logic dispatches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HalFormat {
    /// Versioned interfaces with (major, minor) versions.
    Hidl,
    /// Singly-versioned interfaces.
    Aidl,
    /// Native (non-binder) interfaces; may have no interface name.
    Native,
}

impl HalFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            HalFormat::Hidl => "hidl",
            HalFormat::Aidl => "aidl",
            HalFormat::Native => "native",
        }
    }
}

impl fmt::Display for HalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HalFormat {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hidl" => Ok(HalFormat::Hidl),
            "aidl" => Ok(HalFormat::Aidl),
            "native" => Ok(HalFormat::Native),
            _ => Err(EnumParseError {
                what: "HAL format",
                value: s.to_string(),
            }),
        }
    }
}

/// How an interface instance is reached.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    #[serde(rename = "")]
    Empty,
    HwBinder,
    Passthrough,
    Inet,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Empty => "",
            Transport::HwBinder => "hwbinder",
            Transport::Passthrough => "passthrough",
            Transport::Inet => "inet",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Transport {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Transport::Empty),
            "hwbinder" => Ok(Transport::HwBinder),
            "passthrough" => Ok(Transport::Passthrough),
            "inet" => Ok(Transport::Inet),
            _ => Err(EnumParseError {
                what: "transport",
                value: s.to_string(),
            }),
        }
    }
}

/// CPU architectures a passthrough interface is built for.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Arch {
    #[default]
    #[serde(rename = "")]
    Empty,
    #[serde(rename = "32")]
    Arch32,
    #[serde(rename = "64")]
    Arch64,
    #[serde(rename = "32+64")]
    Arch32_64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Empty => "",
            Arch::Arch32 => "32",
            Arch::Arch64 => "64",
            Arch::Arch32_64 => "32+64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Arch::Empty),
            "32" => Ok(Arch::Arch32),
            "64" => Ok(Arch::Arch64),
            "32+64" => Ok(Arch::Arch32_64),
            _ => Err(EnumParseError {
                what: "arch",
                value: s.to_string(),
            }),
        }
    }
}

/// Transport kind plus architecture bitness, or a network endpoint for the
/// inet transport.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TransportArch {
    pub transport: Transport,
    pub arch: Arch,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port: Option<u16>,
}

impl TransportArch {
    pub fn new(transport: Transport, arch: Arch) -> Self {
        TransportArch {
            transport,
            arch,
            ip: None,
            port: None,
        }
    }

    pub fn inet(ip: impl Into<String>, port: u16) -> Self {
        TransportArch {
            transport: Transport::Inet,
            arch: Arch::Empty,
            ip: Some(ip.into()),
            port: Some(port),
        }
    }

    /// Structural coherence: only the inet transport carries an endpoint, and
    /// only passthrough carries an arch bitmask.
    pub fn is_valid(&self) -> bool {
        match self.transport {
            Transport::Inet => self.ip.is_some() && self.port.is_some() && self.arch == Arch::Empty,
            Transport::Passthrough => {
                self.arch != Arch::Empty && self.ip.is_none() && self.port.is_none()
            }
            Transport::HwBinder | Transport::Empty => {
                self.arch == Arch::Empty && self.ip.is_none() && self.port.is_none()
            }
        }
    }
}

impl fmt::Display for TransportArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.transport, self.arch)
    }
}

/// Whether a descriptor describes the device side or the framework side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Device,
    Framework,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Device => "device",
            SchemaType::Framework => "framework",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(SchemaType::Device),
            "framework" => Ok(SchemaType::Framework),
            _ => Err(EnumParseError {
                what: "schema type",
                value: s.to_string(),
            }),
        }
    }
}

/// An ordinal release generation, used to select which matrix fragment or HAL
/// entry applies to a device.
///
/// `UNSPECIFIED` is the numeric maximum so that ordering comparisons treat an
/// unleveled descriptor as newer than every concrete level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub u64);

impl Level {
    pub const LEGACY: Level = Level(1);
    pub const UNSPECIFIED: Level = Level(u64::MAX);

    pub fn is_specified(&self) -> bool {
        *self != Level::UNSPECIFIED
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::UNSPECIFIED
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Level::UNSPECIFIED => write!(f, "unspecified"),
            Level::LEGACY => write!(f, "legacy"),
            Level(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for Level {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "unspecified" => Ok(Level::UNSPECIFIED),
            "legacy" => Ok(Level::LEGACY),
            _ => s.parse::<u64>().map(Level).map_err(|_| EnumParseError {
                what: "level",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level(5) < Level(6));
        assert!(Level::LEGACY < Level(2));
        // Unspecified sorts above every concrete level.
        assert!(Level(1000) < Level::UNSPECIFIED);
        assert!(!Level::UNSPECIFIED.is_specified());
        assert!(Level(3).is_specified());
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("".parse::<Level>().unwrap(), Level::UNSPECIFIED);
        assert_eq!("legacy".parse::<Level>().unwrap(), Level::LEGACY);
        assert_eq!("7".parse::<Level>().unwrap(), Level(7));
        assert!("x".parse::<Level>().is_err());
    }

    #[test]
    fn test_transport_arch_validity() {
        assert!(TransportArch::new(Transport::HwBinder, Arch::Empty).is_valid());
        assert!(!TransportArch::new(Transport::HwBinder, Arch::Arch32).is_valid());
        assert!(TransportArch::new(Transport::Passthrough, Arch::Arch32_64).is_valid());
        assert!(!TransportArch::new(Transport::Passthrough, Arch::Empty).is_valid());
        assert!(TransportArch::inet("192.168.0.1", 12).is_valid());
        assert!(!TransportArch::new(Transport::Inet, Arch::Empty).is_valid());
    }

    #[test]
    fn test_enum_strings() {
        assert_eq!(HalFormat::Aidl.to_string(), "aidl");
        assert_eq!("native".parse::<HalFormat>().unwrap(), HalFormat::Native);
        assert_eq!(SchemaType::Device.to_string(), "device");
        assert_eq!(
            TransportArch::new(Transport::Passthrough, Arch::Arch32).to_string(),
            "passthrough32"
        );
    }
}
