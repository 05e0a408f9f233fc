//! Runtime-reported device facts and their checks
//!
//! Collecting these values (kernel release, verified-boot versions, the
//! loaded policy version) is the job of an external collaborator; this module
//! only consumes them as plain values. There is no global "the device's
//! runtime info" — callers construct one and pass it in explicitly.

use serde::{Deserialize, Serialize};
use vintf_version::Version;

use crate::error::{Result, VintfError};
use crate::kernel::KernelInfo;
use crate::matrix::CompatibilityMatrix;
use crate::types::SchemaType;

/// Which runtime sub-checks to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckFlags {
    avb: bool,
    kernel: bool,
}

impl CheckFlags {
    pub const ENABLE_ALL_CHECKS: CheckFlags = CheckFlags {
        avb: true,
        kernel: true,
    };

    pub fn disable_avb(mut self) -> Self {
        self.avb = false;
        self
    }

    pub fn disable_kernel(mut self) -> Self {
        self.kernel = false;
        self
    }
}

impl Default for CheckFlags {
    fn default() -> Self {
        CheckFlags::ENABLE_ALL_CHECKS
    }
}

/// What the running device reports about itself: kernel version and build
/// configuration, verified-boot versions, and the loaded kernel policy
/// version.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    kernel: KernelInfo,
    boot_avb_version: Version,
    boot_vbmeta_avb_version: Version,
    kernel_sepolicy_version: u64,
}

impl RuntimeInfo {
    pub fn new(kernel: KernelInfo) -> Self {
        RuntimeInfo {
            kernel,
            ..RuntimeInfo::default()
        }
    }

    pub fn with_avb_versions(mut self, boot: Version, boot_vbmeta: Version) -> Self {
        self.boot_avb_version = boot;
        self.boot_vbmeta_avb_version = boot_vbmeta;
        self
    }

    pub fn with_kernel_sepolicy_version(mut self, version: u64) -> Self {
        self.kernel_sepolicy_version = version;
        self
    }

    pub fn kernel(&self) -> &KernelInfo {
        &self.kernel
    }

    pub fn boot_avb_version(&self) -> Version {
        self.boot_avb_version
    }

    pub fn boot_vbmeta_avb_version(&self) -> Version {
        self.boot_vbmeta_avb_version
    }

    pub fn kernel_sepolicy_version(&self) -> u64 {
        self.kernel_sepolicy_version
    }

    /// Check the reported facts against a framework matrix: kernel version
    /// and configs, kernel policy version floor, and verified-boot versions
    /// (same major, minor at or above the requirement) for both the boot
    /// image and the vbmeta image.
    pub fn check_compatibility(
        &self,
        matrix: &CompatibilityMatrix,
        flags: CheckFlags,
    ) -> Result<()> {
        if matrix.schema_type() != SchemaType::Framework {
            return Err(VintfError::TypeMismatch {
                expected: SchemaType::Framework,
                found: matrix.schema_type(),
            });
        }

        let mut problems: Vec<String> = Vec::new();

        if flags.kernel {
            if !matrix.kernels().is_empty() {
                if let Err(e) = self.kernel.match_kernel_requirements(matrix.kernels()) {
                    problems.push(e);
                }
            }
            if let Some(sepolicy) = matrix.sepolicy() {
                if self.kernel_sepolicy_version < sepolicy.kernel_sepolicy_version() {
                    problems.push(format!(
                        "kernel sepolicy version {} is below the required {}",
                        self.kernel_sepolicy_version,
                        sepolicy.kernel_sepolicy_version()
                    ));
                }
            }
        }

        if flags.avb {
            if let Some(required) = matrix.avb_meta_version() {
                for (what, reported) in [
                    ("boot", self.boot_avb_version),
                    ("vbmeta", self.boot_vbmeta_avb_version),
                ] {
                    if !reported.minor_at_least(&required) {
                        problems.push(format!(
                            "AVB version {} of the {} image does not satisfy the required {}",
                            reported, what, required
                        ));
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(VintfError::Incompatible(problems.join("\n")))
        }
    }
}
