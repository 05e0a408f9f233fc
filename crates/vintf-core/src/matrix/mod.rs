//! The required-side aggregate: a compatibility matrix and the engines that
//! combine per-release matrix fragments

mod hal;
mod instance;
mod kernel;

pub use hal::{MatrixHal, MatrixInterface};
pub use instance::{InstancePattern, InstanceRegex, MatrixInstance};
pub use kernel::MatrixKernel;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use vintf_version::{SepolicyVersionRange, Version};

use crate::error::{Result, VintfError};
use crate::ndk::VendorNdk;
use crate::types::{HalFormat, Level, SchemaType};
use crate::xmlfile::MatrixXmlFile;

/// The sepolicy requirement of a framework matrix: a kernel-policy floor plus
/// the acceptable platform policy version ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sepolicy {
    kernel_sepolicy_version: u64,
    version_ranges: Vec<SepolicyVersionRange>,
}

impl Sepolicy {
    pub fn new(kernel_sepolicy_version: u64, version_ranges: Vec<SepolicyVersionRange>) -> Self {
        Sepolicy {
            kernel_sepolicy_version,
            version_ranges,
        }
    }

    pub fn kernel_sepolicy_version(&self) -> u64 {
        self.kernel_sepolicy_version
    }

    pub fn version_ranges(&self) -> &[SepolicyVersionRange] {
        &self.version_ranges
    }
}

/// The required-side specification: HAL requirements organized by release
/// level, plus the side-channel requirements (kernel, sepolicy and verified
/// boot on the framework side; vendor NDK and system SDK on the device side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityMatrix {
    schema_type: SchemaType,
    level: Level,
    hals: IndexMap<String, Vec<MatrixHal>>,
    kernels: Vec<MatrixKernel>,
    sepolicy: Option<Sepolicy>,
    avb_meta_version: Option<Version>,
    vendor_ndk: Option<VendorNdk>,
    system_sdk: BTreeSet<String>,
    xml_files: Vec<MatrixXmlFile>,
}

impl CompatibilityMatrix {
    pub fn new(schema_type: SchemaType) -> Self {
        CompatibilityMatrix {
            schema_type,
            level: Level::UNSPECIFIED,
            hals: IndexMap::new(),
            kernels: Vec::new(),
            sepolicy: None,
            avb_meta_version: None,
            vendor_ndk: None,
            system_sdk: BTreeSet::new(),
            xml_files: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn schema_type(&self) -> SchemaType {
        self.schema_type
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    pub fn kernels(&self) -> &[MatrixKernel] {
        &self.kernels
    }

    pub fn sepolicy(&self) -> Option<&Sepolicy> {
        self.sepolicy.as_ref()
    }

    pub fn set_sepolicy(&mut self, sepolicy: Sepolicy) {
        self.sepolicy = Some(sepolicy);
    }

    pub fn avb_meta_version(&self) -> Option<Version> {
        self.avb_meta_version
    }

    pub fn set_avb_meta_version(&mut self, version: Version) {
        self.avb_meta_version = Some(version);
    }

    pub fn vendor_ndk(&self) -> Option<&VendorNdk> {
        self.vendor_ndk.as_ref()
    }

    pub fn set_vendor_ndk(&mut self, vendor_ndk: VendorNdk) {
        self.vendor_ndk = Some(vendor_ndk);
    }

    pub fn system_sdk(&self) -> &BTreeSet<String> {
        &self.system_sdk
    }

    pub fn add_system_sdk_version(&mut self, version: impl Into<String>) {
        self.system_sdk.insert(version.into());
    }

    pub fn xml_files(&self) -> &[MatrixXmlFile] {
        &self.xml_files
    }

    pub fn add_xml_file(&mut self, file: MatrixXmlFile) {
        self.xml_files.push(file);
    }

    /// Every HAL entry, grouped by name in first-insertion order.
    pub fn hals(&self) -> impl Iterator<Item = &MatrixHal> {
        self.hals.values().flatten()
    }

    /// Every HAL entry declared under `name`.
    pub fn get_hals(&self, name: &str) -> &[MatrixHal] {
        self.hals.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_hal(&mut self, hal: MatrixHal) -> Result<()> {
        hal.validate()?;
        self.hals.entry(hal.name.clone()).or_default().push(hal);
        Ok(())
    }

    /// Insert one kernel requirement, keeping the unconditioned baseline of
    /// each version first. At most one unconditioned block may exist per
    /// version.
    pub fn add_kernel(&mut self, kernel: MatrixKernel) -> Result<()> {
        let group_start = self
            .kernels
            .iter()
            .position(|k| k.min_lts() == kernel.min_lts());

        match group_start {
            None => self.kernels.push(kernel),
            Some(start) => {
                if kernel.conditions().is_empty() {
                    if self.kernels[start].conditions().is_empty() {
                        return Err(VintfError::Conflict(format!(
                            "multiple unconditioned kernel requirements for version {}",
                            kernel.min_lts()
                        )));
                    }
                    self.kernels.insert(start, kernel);
                } else {
                    let end = self.kernels[start..]
                        .iter()
                        .position(|k| k.min_lts() != kernel.min_lts())
                        .map(|offset| start + offset)
                        .unwrap_or(self.kernels.len());
                    self.kernels.insert(end, kernel);
                }
            }
        }
        Ok(())
    }

    /// Visit every (version range × interface × instance) leaf of every
    /// entry; stops and returns false when the callback does.
    pub fn for_each_instance(&self, mut f: impl FnMut(&MatrixInstance) -> bool) -> bool {
        for hal in self.hals() {
            if !hal.for_each_instance(&mut f) {
                return false;
            }
        }
        true
    }

    /// Whether some requirement leaf matches the given provided identity.
    /// Uses the floor-only version direction, so this agrees with the
    /// satisfiability engine about what counts as used.
    pub fn match_instance(
        &self,
        format: HalFormat,
        package: &str,
        version: Version,
        interface: &str,
        instance: &str,
    ) -> bool {
        for hal in self.get_hals(package) {
            if hal.format != format {
                continue;
            }
            let mut found = false;
            hal.for_each_instance(|leaf| {
                if leaf.interface() == interface
                    && leaf.version_range().supported_by(&version)
                    && leaf.matches_instance(instance)
                {
                    found = true;
                }
                !found
            });
            if found {
                return true;
            }
        }
        false
    }

    /// Fold another matrix of the same schema type into this one. HAL and
    /// XML-file requirements union; sepolicy, verified-boot and vendor-NDK
    /// requirements are global device properties and may be declared by at
    /// most one contributor.
    pub fn add_all(&mut self, mut other: CompatibilityMatrix) -> Result<()> {
        if other.schema_type != self.schema_type {
            return Err(VintfError::TypeMismatch {
                expected: self.schema_type,
                found: other.schema_type,
            });
        }
        for (_, hals) in std::mem::take(&mut other.hals) {
            for hal in hals {
                self.add_hal(hal)?;
            }
        }
        for kernel in std::mem::take(&mut other.kernels) {
            self.add_kernel(kernel)?;
        }
        self.merge_globals(
            other.sepolicy.take(),
            other.avb_meta_version.take(),
            other.vendor_ndk.take(),
        )?;
        self.system_sdk.extend(std::mem::take(&mut other.system_sdk));
        self.xml_files.append(&mut other.xml_files);
        Ok(())
    }

    fn merge_globals(
        &mut self,
        sepolicy: Option<Sepolicy>,
        avb_meta_version: Option<Version>,
        vendor_ndk: Option<VendorNdk>,
    ) -> Result<()> {
        if let Some(sepolicy) = sepolicy {
            if self.sepolicy.is_some() {
                return Err(VintfError::Conflict(
                    "sepolicy requirement already defined".to_string(),
                ));
            }
            self.sepolicy = Some(sepolicy);
        }
        if let Some(version) = avb_meta_version {
            if self.avb_meta_version.is_some() {
                return Err(VintfError::Conflict(
                    "avb vbmeta-version already defined".to_string(),
                ));
            }
            self.avb_meta_version = Some(version);
        }
        if let Some(vendor_ndk) = vendor_ndk {
            if self.vendor_ndk.is_some() {
                return Err(VintfError::Conflict(
                    "vendor NDK requirement already defined".to_string(),
                ));
            }
            self.vendor_ndk = Some(vendor_ndk);
        }
        Ok(())
    }

    /// Fold a higher-level matrix's HAL requirements into this one without
    /// making anything newly mandatory.
    ///
    /// Per incoming interface/instance: if some existing same-name entry
    /// already requires that instance, only that instance's entry has its
    /// version ranges extended (the entry is split first when it carries
    /// sibling instances). Instances not required anywhere are re-grouped
    /// into new entries marked optional. No-op unless `other` has a strictly
    /// higher level.
    pub fn add_all_hals_as_optional(&mut self, other: &mut CompatibilityMatrix) -> Result<()> {
        if other.level <= self.level {
            log::debug!(
                "not folding matrix at level {} into level {}",
                other.level,
                self.level
            );
            return Ok(());
        }

        for (_, hals) in std::mem::take(&mut other.hals) {
            for mut hal in hals {
                let entries = hal.instance_entries();
                if entries.is_empty() {
                    // Version-only requirement; nothing to merge instance-wise.
                    hal.set_optional(true);
                    self.add_hal(hal)?;
                    continue;
                }

                let mut inserted: Vec<(String, String, bool)> = Vec::new();
                for (interface, text, is_regex) in entries {
                    let Some(existing_list) = self.hals.get_mut(&hal.name) else {
                        continue;
                    };
                    let Some(index) = existing_list
                        .iter()
                        .position(|h| h.has_instance(&interface, &text, is_regex))
                    else {
                        continue;
                    };
                    let target = match existing_list[index].split_instance(
                        &interface,
                        &text,
                        is_regex,
                    ) {
                        Some(split) => {
                            existing_list.push(split);
                            existing_list.len() - 1
                        }
                        None => index,
                    };
                    existing_list[target].insert_version_ranges(hal.version_ranges());
                    inserted.push((interface, text, is_regex));
                }

                for (interface, text, is_regex) in &inserted {
                    hal.remove_instance(interface, text, *is_regex);
                }
                if hal.has_any_instance() {
                    log::debug!("adding {} as an optional requirement", hal.name);
                    hal.set_optional(true);
                    self.add_hal(hal)?;
                }
            }
        }
        Ok(())
    }

    /// The XML-file counterpart of
    /// [`add_all_hals_as_optional`](Self::add_all_hals_as_optional).
    pub fn add_all_xml_files_as_optional(&mut self, other: &mut CompatibilityMatrix) -> Result<()> {
        if other.level <= self.level {
            return Ok(());
        }
        for mut file in std::mem::take(&mut other.xml_files) {
            let existing = self
                .xml_files
                .iter_mut()
                .find(|e| e.name == file.name && e.version_range.overlaps(&file.version_range));
            match existing {
                Some(existing) => {
                    existing.version_range.min_minor = existing
                        .version_range
                        .min_minor
                        .min(file.version_range.min_minor);
                    existing.version_range.max_minor = existing
                        .version_range
                        .max_minor
                        .max(file.version_range.max_minor);
                }
                None => {
                    file.optional = true;
                    self.xml_files.push(file);
                }
            }
        }
        Ok(())
    }

    /// Combine per-level framework matrices into the single matrix applicable
    /// to a device at `device_level`.
    ///
    /// The fragment whose level equals the device level is the base (further
    /// same-level and unleveled fragments merge into it); higher-level
    /// fragments fold in as optional; lower-level fragments contribute no HAL
    /// requirements. Kernel requirements are taken from every fragment at or
    /// above min(kernel level, device level).
    pub fn combine(
        device_level: Level,
        kernel_level: Level,
        matrices: Vec<CompatibilityMatrix>,
    ) -> Result<CompatibilityMatrix> {
        for matrix in &matrices {
            if matrix.schema_type != SchemaType::Framework {
                return Err(VintfError::TypeMismatch {
                    expected: SchemaType::Framework,
                    found: matrix.schema_type,
                });
            }
        }

        let mut inputs = matrices;
        // Kernels merge on their own level rule; set them aside first.
        let kernel_groups: Vec<(Level, Vec<MatrixKernel>)> = inputs
            .iter_mut()
            .map(|m| (m.level, std::mem::take(&mut m.kernels)))
            .collect();

        let mut base: Option<CompatibilityMatrix> = None;
        let mut higher: Vec<CompatibilityMatrix> = Vec::new();
        let mut lower: Vec<CompatibilityMatrix> = Vec::new();
        for matrix in inputs {
            // An unleveled fragment counts as device-level.
            let level = if matrix.level.is_specified() {
                matrix.level
            } else {
                device_level
            };
            if level == device_level {
                match &mut base {
                    None => {
                        let mut matrix = matrix;
                        matrix.level = device_level;
                        base = Some(matrix);
                    }
                    Some(base) => base.add_all(matrix)?,
                }
            } else if level > device_level {
                higher.push(matrix);
            } else {
                lower.push(matrix);
            }
        }
        let Some(mut base) = base else {
            return Err(VintfError::Conflict(format!(
                "cannot find a matrix fragment with level {}",
                device_level
            )));
        };

        higher.sort_by_key(|m| m.level);
        for mut matrix in higher {
            log::debug!(
                "folding level-{} requirements into level-{} matrix as optional",
                matrix.level,
                device_level
            );
            base.add_all_hals_as_optional(&mut matrix)?;
            base.add_all_xml_files_as_optional(&mut matrix)?;
            base.merge_globals(
                matrix.sepolicy.take(),
                matrix.avb_meta_version.take(),
                matrix.vendor_ndk.take(),
            )?;
            base.system_sdk.extend(std::mem::take(&mut matrix.system_sdk));
        }

        // Superseded fragments contribute no requirements, but a second
        // declaration of a global device property is still a conflict.
        for mut matrix in lower {
            base.merge_globals(
                matrix.sepolicy.take(),
                matrix.avb_meta_version.take(),
                matrix.vendor_ndk.take(),
            )?;
        }

        let kernel_floor = if kernel_level.is_specified() {
            kernel_level.min(device_level)
        } else {
            device_level
        };
        for (level, kernels) in kernel_groups {
            let effective = if level.is_specified() { level } else { device_level };
            if effective < kernel_floor {
                log::debug!(
                    "dropping kernel requirements of level {} below effective kernel level {}",
                    level,
                    kernel_floor
                );
                continue;
            }
            for kernel in kernels {
                base.add_kernel(kernel)?;
            }
        }

        Ok(base)
    }

    /// Union device-supplied matrix fragments (e.g. one per board partition)
    /// into one device matrix. No level gating; the duplicate-declaration
    /// conflict rule for global properties still applies.
    pub fn combine_device_matrices(
        matrices: Vec<CompatibilityMatrix>,
    ) -> Result<CompatibilityMatrix> {
        let mut iter = matrices.into_iter();
        let Some(mut base) = iter.next() else {
            return Err(VintfError::Conflict(
                "no device matrix fragments to combine".to_string(),
            ));
        };
        if base.schema_type != SchemaType::Device {
            return Err(VintfError::TypeMismatch {
                expected: SchemaType::Device,
                found: base.schema_type,
            });
        }
        for matrix in iter {
            base.add_all(matrix)?;
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelConfig, KernelConfigValue, Tristate};
    use vintf_version::{KernelVersion, VersionRange};

    fn framework_matrix(level: u64) -> CompatibilityMatrix {
        CompatibilityMatrix::new(SchemaType::Framework).with_level(Level(level))
    }

    #[test]
    fn test_add_kernel_orders_unconditioned_first() {
        let mut matrix = framework_matrix(1);
        let version = KernelVersion::new(4, 14, 0);
        let cond = KernelConfig::new("CONFIG_ARM", KernelConfigValue::Tristate(Tristate::Yes));

        matrix
            .add_kernel(MatrixKernel::new(version, vec![]).with_conditions(vec![cond.clone()]))
            .unwrap();
        matrix.add_kernel(MatrixKernel::new(version, vec![])).unwrap();
        matrix
            .add_kernel(MatrixKernel::new(version, vec![]).with_conditions(vec![cond]))
            .unwrap();

        let conditioned: Vec<bool> = matrix
            .kernels()
            .iter()
            .map(|k| !k.conditions().is_empty())
            .collect();
        assert_eq!(conditioned, vec![false, true, true]);
    }

    #[test]
    fn test_add_kernel_duplicate_unconditioned() {
        let mut matrix = framework_matrix(1);
        let version = KernelVersion::new(4, 14, 0);
        matrix.add_kernel(MatrixKernel::new(version, vec![])).unwrap();
        assert!(matches!(
            matrix.add_kernel(MatrixKernel::new(version, vec![])),
            Err(VintfError::Conflict(_))
        ));
        // A different version keeps its own group.
        matrix
            .add_kernel(MatrixKernel::new(KernelVersion::new(4, 19, 0), vec![]))
            .unwrap();
    }

    #[test]
    fn test_add_all_global_conflicts() {
        let mut a = framework_matrix(1);
        a.set_avb_meta_version(Version::new(1, 0));
        let mut b = framework_matrix(1);
        b.set_avb_meta_version(Version::new(2, 0));
        let err = a.add_all(b).unwrap_err();
        assert!(err.to_string().contains("already defined"), "{}", err);
    }

    #[test]
    fn test_match_instance() {
        let mut matrix = framework_matrix(1);
        let mut hal = MatrixHal::new(
            HalFormat::Hidl,
            "android.hardware.foo",
            vec![VersionRange::new(1, 2, 3)],
            false,
        );
        hal.add_instance("IFoo", "default");
        matrix.add_hal(hal).unwrap();

        assert!(matrix.match_instance(
            HalFormat::Hidl,
            "android.hardware.foo",
            Version::new(1, 3),
            "IFoo",
            "default"
        ));
        // Floor-only direction: a newer minor still matches.
        assert!(matrix.match_instance(
            HalFormat::Hidl,
            "android.hardware.foo",
            Version::new(1, 9),
            "IFoo",
            "default"
        ));
        assert!(!matrix.match_instance(
            HalFormat::Hidl,
            "android.hardware.foo",
            Version::new(1, 0),
            "IFoo",
            "default"
        ));
        assert!(!matrix.match_instance(
            HalFormat::Aidl,
            "android.hardware.foo",
            Version::new(1, 3),
            "IFoo",
            "default"
        ));
    }

    #[test]
    fn test_combine_device_matrices_requires_device_type() {
        let result = CompatibilityMatrix::combine_device_matrices(vec![framework_matrix(1)]);
        assert!(matches!(result, Err(VintfError::TypeMismatch { .. })));
    }
}
