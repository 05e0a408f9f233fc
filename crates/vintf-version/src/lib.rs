//! Version algebra for HAL compatibility metadata
//!
//! This crate provides the plain version value types used by manifests and
//! compatibility matrices: two-part interface versions, minor-version ranges
//! within one major line, sepolicy versions with optional (unbounded) minors,
//! and three-part kernel versions.

mod kernel;
mod range;
mod version;

pub use kernel::KernelVersion;
pub use range::{SepolicyVersionRange, VersionRange};
pub use version::{
    SepolicyVersion, Version, VersionParseError, DEFAULT_AIDL_MINOR_VERSION,
    FAKE_AIDL_MAJOR_VERSION,
};
