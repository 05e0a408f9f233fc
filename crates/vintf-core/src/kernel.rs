//! Kernel configuration values and the reported-kernel descriptor

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vintf_version::KernelVersion;

use crate::matrix::MatrixKernel;
use crate::types::EnumParseError;

/// Kernel config tristate: built in, absent, or built as a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tristate {
    #[serde(rename = "y")]
    Yes,
    #[serde(rename = "n")]
    No,
    #[serde(rename = "m")]
    Module,
}

impl Tristate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tristate::Yes => "y",
            Tristate::No => "n",
            Tristate::Module => "m",
        }
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tristate {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "y" => Ok(Tristate::Yes),
            "n" => Ok(Tristate::No),
            "m" => Ok(Tristate::Module),
            _ => Err(EnumParseError {
                what: "tristate",
                value: s.to_string(),
            }),
        }
    }
}

/// A typed kernel config value as declared by a requirement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelConfigValue {
    String(String),
    Integer(i64),
    Range(u64, u64),
    Tristate(Tristate),
}

/// Kernel config integers accept decimal, hex, and negative decimal forms.
fn parse_config_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as i64);
    }
    if s.starts_with('-') {
        return s.parse::<i64>().ok();
    }
    s.parse::<u64>().ok().map(|v| v as i64)
}

impl KernelConfigValue {
    /// Infer a typed value from a raw declared string: quoted means string,
    /// an integer means integer, y/n/m means tristate. Ranges are never
    /// inferred; they must be constructed explicitly.
    pub fn infer(raw: &str) -> Option<KernelConfigValue> {
        if raw.len() > 1 && raw.starts_with('"') && raw.ends_with('"') {
            return Some(KernelConfigValue::String(raw[1..raw.len() - 1].to_string()));
        }
        if let Some(i) = parse_config_int(raw) {
            return Some(KernelConfigValue::Integer(i));
        }
        if let Ok(t) = raw.parse::<Tristate>() {
            return Some(KernelConfigValue::Tristate(t));
        }
        None
    }

    /// Parse a reported raw value according to this value's own type and
    /// compare for equality.
    pub fn matches_raw(&self, raw: &str) -> bool {
        match self {
            KernelConfigValue::String(s) => s == raw,
            KernelConfigValue::Integer(i) => parse_config_int(raw) == Some(*i),
            KernelConfigValue::Range(lo, hi) => match raw.split_once('-') {
                Some((a, b)) => {
                    parse_config_int(a) == Some(*lo as i64)
                        && parse_config_int(b) == Some(*hi as i64)
                }
                None => false,
            },
            KernelConfigValue::Tristate(t) => raw.parse::<Tristate>().ok() == Some(*t),
        }
    }

    /// A tristate-no requirement is the only one satisfied by an absent
    /// config.
    pub fn matches_missing(&self) -> bool {
        *self == KernelConfigValue::Tristate(Tristate::No)
    }
}

impl fmt::Display for KernelConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelConfigValue::String(s) => write!(f, "{}", s),
            KernelConfigValue::Integer(i) => write!(f, "{}", i),
            KernelConfigValue::Range(lo, hi) => write!(f, "{}-{}", lo, hi),
            KernelConfigValue::Tristate(t) => write!(f, "{}", t),
        }
    }
}

/// One required kernel config: a `CONFIG_*` key and its typed value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KernelConfig {
    pub key: String,
    pub value: KernelConfigValue,
}

impl KernelConfig {
    pub fn new(key: impl Into<String>, value: KernelConfigValue) -> Self {
        KernelConfig {
            key: key.into(),
            value,
        }
    }
}

impl fmt::Display for KernelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// The kernel a device runs: version plus the raw build configuration as
/// reported (key to raw value string).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelInfo {
    version: KernelVersion,
    configs: BTreeMap<String, String>,
}

impl KernelInfo {
    pub fn new(version: KernelVersion) -> Self {
        KernelInfo {
            version,
            configs: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configs.insert(key.into(), value.into());
        self
    }

    pub fn version(&self) -> KernelVersion {
        self.version
    }

    pub fn configs(&self) -> &BTreeMap<String, String> {
        &self.configs
    }

    /// Check every required config against the reported configuration.
    /// Returns the first mismatch as a message.
    pub(crate) fn match_kernel_configs(&self, required: &[KernelConfig]) -> Result<(), String> {
        for config in required {
            match self.configs.get(&config.key) {
                None => {
                    if config.value.matches_missing() {
                        continue;
                    }
                    return Err(format!("missing config {}", config.key));
                }
                Some(raw) => {
                    if !config.value.matches_raw(raw) {
                        return Err(format!(
                            "config {} has value {} but {} is required",
                            config.key, raw, config.value
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Check this kernel against a matrix's kernel requirements.
    ///
    /// A requirement block applies when its version matches and all of its
    /// `conditions` hold. Version matching is an OR across blocks; within one
    /// block the conditions AND. Every applicable block's configs must then be
    /// satisfied.
    pub fn match_kernel_requirements(&self, kernels: &[MatrixKernel]) -> Result<(), String> {
        if kernels.is_empty() {
            return Ok(());
        }

        let mut found_version = false;
        let mut found_conditions = false;
        for kernel in kernels {
            if !self.version.meets_min_lts(kernel.min_lts()) {
                continue;
            }
            found_version = true;

            if let Err(e) = self.match_kernel_configs(kernel.conditions()) {
                log::trace!(
                    "kernel block {} skipped, condition not met: {}",
                    kernel.min_lts(),
                    e
                );
                continue;
            }
            found_conditions = true;

            if let Err(e) = self.match_kernel_configs(kernel.configs()) {
                return Err(format!("for kernel {}: {}", kernel.min_lts(), e));
            }
        }

        if !found_version {
            let declared: Vec<String> = kernels.iter().map(|k| k.min_lts().to_string()).collect();
            return Err(format!(
                "kernel version {} does not match any requirement (declared minimums: {})",
                self.version,
                declared.join(", ")
            ));
        }
        if !found_conditions {
            return Err(format!(
                "no kernel requirement block for version {} has its conditions met",
                self.version
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer() {
        assert_eq!(
            KernelConfigValue::infer("\"binder\""),
            Some(KernelConfigValue::String("binder".to_string()))
        );
        assert_eq!(
            KernelConfigValue::infer("24"),
            Some(KernelConfigValue::Integer(24))
        );
        assert_eq!(
            KernelConfigValue::infer("-16"),
            Some(KernelConfigValue::Integer(-16))
        );
        assert_eq!(
            KernelConfigValue::infer("0x10"),
            Some(KernelConfigValue::Integer(16))
        );
        assert_eq!(
            KernelConfigValue::infer("y"),
            Some(KernelConfigValue::Tristate(Tristate::Yes))
        );
        // Ranges are never inferred.
        assert_eq!(KernelConfigValue::infer("gibberish"), None);
    }

    #[test]
    fn test_matches_raw() {
        assert!(KernelConfigValue::Tristate(Tristate::Yes).matches_raw("y"));
        assert!(!KernelConfigValue::Tristate(Tristate::Yes).matches_raw("m"));
        assert!(KernelConfigValue::Integer(16).matches_raw("0x10"));
        assert!(KernelConfigValue::String("foo".to_string()).matches_raw("foo"));
        // The required type drives parsing: a tristate never matches a string
        // requirement, even if the characters coincide.
        assert!(!KernelConfigValue::Integer(1).matches_raw("y"));
        assert!(KernelConfigValue::Range(1, 4).matches_raw("1-4"));
        assert!(!KernelConfigValue::Range(1, 4).matches_raw("1-5"));
    }

    #[test]
    fn test_missing_config() {
        let info = KernelInfo::new(KernelVersion::new(4, 14, 0));
        // Tristate-no is satisfied by absence.
        assert!(info
            .match_kernel_configs(&[KernelConfig::new(
                "CONFIG_FOO",
                KernelConfigValue::Tristate(Tristate::No)
            )])
            .is_ok());
        assert!(info
            .match_kernel_configs(&[KernelConfig::new(
                "CONFIG_FOO",
                KernelConfigValue::Tristate(Tristate::Yes)
            )])
            .is_err());
    }

    #[test]
    fn test_requirement_blocks() {
        let req_a = KernelConfig::new("CONFIG_A", KernelConfigValue::Tristate(Tristate::Yes));
        let req_b = KernelConfig::new("CONFIG_B", KernelConfigValue::Integer(64));
        let cond_arm = KernelConfig::new("CONFIG_ARM", KernelConfigValue::Tristate(Tristate::Yes));

        let baseline = MatrixKernel::new(KernelVersion::new(4, 14, 0), vec![req_a.clone()]);
        let conditioned = MatrixKernel::new(KernelVersion::new(4, 14, 0), vec![req_b.clone()])
            .with_conditions(vec![cond_arm.clone()]);
        let kernels = vec![baseline, conditioned];

        // Condition not met: only the baseline applies.
        let plain = KernelInfo::new(KernelVersion::new(4, 14, 42)).with_config("CONFIG_A", "y");
        assert!(plain.match_kernel_requirements(&kernels).is_ok());

        // Condition met: the conditioned block's configs apply too.
        let arm = KernelInfo::new(KernelVersion::new(4, 14, 42))
            .with_config("CONFIG_A", "y")
            .with_config("CONFIG_ARM", "y");
        assert!(arm.match_kernel_requirements(&kernels).is_err());

        let arm_ok = arm.with_config("CONFIG_B", "64");
        assert!(arm_ok.match_kernel_requirements(&kernels).is_ok());

        // No version match at all.
        let old = KernelInfo::new(KernelVersion::new(3, 18, 22));
        assert!(old.match_kernel_requirements(&kernels).is_err());
    }
}
