//! The provided-side aggregate: a device or framework inventory

mod hal;
mod instance;

pub use hal::ManifestHal;
pub use instance::ManifestInstance;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use vintf_version::{SepolicyVersion, SepolicyVersionRange, Version, VersionRange};

use crate::error::{Result, VintfError};
use crate::kernel::KernelInfo;
use crate::matrix::{CompatibilityMatrix, MatrixHal, MatrixKernel, Sepolicy};
use crate::ndk::VendorNdk;
use crate::types::{HalFormat, Level, SchemaType};
use crate::xmlfile::ManifestXmlFile;

/// The provided-side inventory: HAL entries plus the side-channel facts a
/// compatibility check consumes (sepolicy version and kernel on the device
/// side, vendor NDK and system SDK on the framework side).
///
/// Built incrementally: one [`Manifest`] per source fragment, folded together
/// with [`add_all`](Manifest::add_all).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    schema_type: SchemaType,
    level: Level,
    hals: IndexMap<String, Vec<ManifestHal>>,
    sepolicy_version: Option<SepolicyVersion>,
    kernel: Option<KernelInfo>,
    vendor_ndks: Vec<VendorNdk>,
    system_sdk: BTreeSet<String>,
    xml_files: Vec<ManifestXmlFile>,
}

impl Manifest {
    pub fn new(schema_type: SchemaType) -> Self {
        Manifest {
            schema_type,
            level: Level::UNSPECIFIED,
            hals: IndexMap::new(),
            sepolicy_version: None,
            kernel: None,
            vendor_ndks: Vec::new(),
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

    pub fn sepolicy_version(&self) -> Option<SepolicyVersion> {
        self.sepolicy_version
    }

    pub fn set_sepolicy_version(&mut self, version: SepolicyVersion) {
        self.sepolicy_version = Some(version);
    }

    pub fn kernel(&self) -> Option<&KernelInfo> {
        self.kernel.as_ref()
    }

    pub fn set_kernel(&mut self, kernel: KernelInfo) {
        self.kernel = Some(kernel);
    }

    pub fn vendor_ndks(&self) -> &[VendorNdk] {
        &self.vendor_ndks
    }

    pub fn add_vendor_ndk(&mut self, vendor_ndk: VendorNdk) {
        self.vendor_ndks.push(vendor_ndk);
    }

    pub fn system_sdk(&self) -> &BTreeSet<String> {
        &self.system_sdk
    }

    pub fn add_system_sdk_version(&mut self, version: impl Into<String>) {
        self.system_sdk.insert(version.into());
    }

    pub fn xml_files(&self) -> &[ManifestXmlFile] {
        &self.xml_files
    }

    pub fn add_xml_file(&mut self, file: ManifestXmlFile) {
        self.xml_files.push(file);
    }

    /// Every HAL entry, grouped by name in first-insertion order.
    pub fn hals(&self) -> impl Iterator<Item = &ManifestHal> {
        self.hals.values().flatten()
    }

    /// Every HAL entry declared under `name`.
    pub fn get_hals(&self, name: &str) -> &[ManifestHal] {
        self.hals.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add one HAL entry. Non-override entries conflict with an existing
    /// entry of the same name on an already-declared major version line.
    pub fn add_hal(&mut self, hal: ManifestHal) -> Result<()> {
        hal.validate()?;
        if !hal.is_override() {
            let existing_majors: BTreeSet<u64> = self
                .get_hals(&hal.name)
                .iter()
                .flat_map(|h| h.majors())
                .collect();
            if let Some(major) = hal.majors().intersection(&existing_majors).next() {
                return Err(VintfError::Conflict(format!(
                    "HAL {} declares major version {} more than once across fragments",
                    hal.name, major
                )));
            }
        }
        self.hals.entry(hal.name.clone()).or_default().push(hal);
        Ok(())
    }

    /// Fold another manifest fragment into this one.
    ///
    /// Non-overridable scalars (target level, sepolicy version, kernel
    /// version) must agree or be absent on one side. HAL entries marked
    /// `override` first remove every existing same-name entry on the major
    /// lines they redeclare; an override with no declared version removes all
    /// same-name entries.
    pub fn add_all(&mut self, other: Manifest) -> Result<()> {
        if other.schema_type != self.schema_type {
            return Err(VintfError::TypeMismatch {
                expected: self.schema_type,
                found: other.schema_type,
            });
        }

        if other.level.is_specified() {
            if !self.level.is_specified() {
                self.level = other.level;
            } else if self.level != other.level {
                return Err(VintfError::Conflict(format!(
                    "conflicting target levels: {} vs {}",
                    self.level, other.level
                )));
            }
        }

        if let Some(version) = other.sepolicy_version {
            match self.sepolicy_version {
                None => self.sepolicy_version = Some(version),
                Some(existing) if existing != version => {
                    return Err(VintfError::Conflict(format!(
                        "conflicting sepolicy versions: {} vs {}",
                        existing, version
                    )));
                }
                Some(_) => {}
            }
        }

        if let Some(kernel) = other.kernel {
            match &mut self.kernel {
                None => self.kernel = Some(kernel),
                Some(existing) => {
                    if existing.version() != kernel.version() {
                        return Err(VintfError::Conflict(format!(
                            "conflicting kernel versions: {} vs {}",
                            existing.version(),
                            kernel.version()
                        )));
                    }
                    *existing = Self::merge_kernel_configs(existing, &kernel)?;
                }
            }
        }

        for (_, hals) in other.hals {
            for hal in hals {
                if hal.is_override() {
                    self.remove_overridden(&hal);
                }
                log::debug!("merging HAL {} ({})", hal.name, hal.format);
                self.add_hal(hal)?;
            }
        }

        for vendor_ndk in other.vendor_ndks {
            if self
                .vendor_ndks
                .iter()
                .any(|existing| existing.version == vendor_ndk.version)
            {
                return Err(VintfError::Conflict(format!(
                    "vendor NDK version {} declared more than once",
                    vendor_ndk.version
                )));
            }
            self.vendor_ndks.push(vendor_ndk);
        }

        self.system_sdk.extend(other.system_sdk);

        for file in other.xml_files {
            if self.xml_files.iter().any(|existing| existing.name == file.name) {
                return Err(VintfError::Conflict(format!(
                    "XML file {} declared more than once",
                    file.name
                )));
            }
            self.xml_files.push(file);
        }

        Ok(())
    }

    fn merge_kernel_configs(a: &KernelInfo, b: &KernelInfo) -> Result<KernelInfo> {
        let mut merged = a.clone();
        for (key, value) in b.configs() {
            match a.configs().get(key) {
                Some(existing) if existing != value => {
                    return Err(VintfError::Conflict(format!(
                        "conflicting kernel config {}: {} vs {}",
                        key, existing, value
                    )));
                }
                Some(_) => {}
                None => merged = merged.with_config(key.clone(), value.clone()),
            }
        }
        Ok(merged)
    }

    /// Apply an override entry's removal policy to the existing entries.
    fn remove_overridden(&mut self, hal: &ManifestHal) {
        let majors = hal.majors();
        let Some(existing) = self.hals.get_mut(&hal.name) else {
            return;
        };
        if majors.is_empty() {
            log::debug!("override removes every entry named {}", hal.name);
            existing.clear();
        } else {
            log::debug!(
                "override removes majors {:?} from entries named {}",
                majors,
                hal.name
            );
            for entry in existing.iter_mut() {
                entry.retain_excluding_majors(&majors);
            }
            existing.retain(|entry| !entry.is_empty());
        }
        if existing.is_empty() {
            self.hals.shift_remove(&hal.name);
        }
    }

    /// Visit every provided instance across all entries; stops and returns
    /// false when the callback does.
    pub fn for_each_instance(&self, mut f: impl FnMut(&ManifestInstance) -> bool) -> bool {
        for hal in self.hals() {
            if !hal.for_each_instance(&mut f) {
                return false;
            }
        }
        true
    }

    fn get_instances(
        &self,
        format: HalFormat,
        package: &str,
        version: Version,
        interface: &str,
    ) -> BTreeSet<String> {
        let mut instances = BTreeSet::new();
        for hal in self.get_hals(package) {
            if hal.format != format {
                continue;
            }
            hal.for_each_instance(|instance| {
                if instance.interface() == interface
                    && instance.version().minor_at_least(&version)
                {
                    instances.insert(instance.instance().to_string());
                }
                true
            });
        }
        instances
    }

    /// Instance names provided for `package@version::interface` by versioned
    /// HALs, honoring backward-compatible minors.
    pub fn get_hidl_instances(
        &self,
        package: &str,
        version: Version,
        interface: &str,
    ) -> BTreeSet<String> {
        self.get_instances(HalFormat::Hidl, package, version, interface)
    }

    /// Instance names provided for the singly-versioned `package.interface`
    /// at or above `version`.
    pub fn get_aidl_instances(
        &self,
        package: &str,
        version: u64,
        interface: &str,
    ) -> BTreeSet<String> {
        self.get_instances(
            HalFormat::Aidl,
            package,
            Version::from_aidl(version),
            interface,
        )
    }

    pub fn has_hidl_instance(
        &self,
        package: &str,
        version: Version,
        interface: &str,
        instance: &str,
    ) -> bool {
        self.get_hidl_instances(package, version, interface)
            .contains(instance)
    }

    pub fn has_aidl_instance(
        &self,
        package: &str,
        version: u64,
        interface: &str,
        instance: &str,
    ) -> bool {
        self.get_aidl_instances(package, version, interface)
            .contains(instance)
    }

    /// Generate a skeleton matrix that this manifest trivially satisfies:
    /// every provided HAL becomes an optional requirement at its provided
    /// versions. Meant as a starting point for authoring, not a final matrix.
    pub fn generate_compatible_matrix(&self) -> CompatibilityMatrix {
        let target = match self.schema_type {
            SchemaType::Device => SchemaType::Framework,
            SchemaType::Framework => SchemaType::Device,
        };
        let mut matrix = CompatibilityMatrix::new(target).with_level(self.level);

        for hal in self.hals() {
            let ranges: Vec<VersionRange> = hal
                .all_versions()
                .iter()
                .map(|v| VersionRange::single(v.major, v.minor))
                .collect();
            let mut matrix_hal = MatrixHal::new(hal.format, hal.name.as_str(), ranges, true);
            hal.for_each_instance(|instance| {
                if !instance.interface().is_empty() {
                    matrix_hal.add_instance(instance.interface(), instance.instance());
                }
                true
            });
            // The manifest was just validated hal-by-hal; a generated entry
            // can only fail on empty content, which add_hal tolerates.
            let _ = matrix.add_hal(matrix_hal);
        }

        if self.schema_type == SchemaType::Device {
            if let Some(version) = self.sepolicy_version {
                matrix.set_sepolicy(Sepolicy::new(
                    0,
                    vec![SepolicyVersionRange::new(
                        version.major,
                        version.minor,
                        version.minor,
                    )],
                ));
            }
            if let Some(kernel) = &self.kernel {
                let _ = matrix.add_kernel(MatrixKernel::new(kernel.version(), Vec::new()));
            }
        }

        matrix
    }
}
