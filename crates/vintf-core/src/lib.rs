//! Compatibility-metadata engine for a layered hardware/software platform
//!
//! A device-side inventory of interface implementations (a [`Manifest`]) is
//! checked against a framework-side requirement specification (a
//! [`CompatibilityMatrix`]). This crate holds the data model for versioned
//! interface instances, the satisfiability engine, the manifest merge used to
//! fold per-partition fragments into one inventory, and the matrix
//! combination engine used to build a single backward-compatible matrix from
//! per-release fragments.
//!
//! Parsing and printing of the on-disk descriptor formats is a trusted
//! external boundary; this crate only operates on the in-memory model.

pub mod check;
pub mod error;
pub mod fqinstance;
pub mod kernel;
pub mod manifest;
pub mod matrix;
pub mod ndk;
pub mod runtime;
pub mod types;
pub mod xmlfile;

pub use error::{Result, VintfError};
pub use fqinstance::FqInstance;
pub use kernel::{KernelConfig, KernelConfigValue, KernelInfo, Tristate};
pub use manifest::{Manifest, ManifestHal, ManifestInstance};
pub use matrix::{
    CompatibilityMatrix, InstanceRegex, MatrixHal, MatrixInstance, MatrixKernel, Sepolicy,
};
pub use ndk::VendorNdk;
pub use runtime::{CheckFlags, RuntimeInfo};
pub use types::{Arch, HalFormat, Level, SchemaType, Transport, TransportArch};
pub use xmlfile::{ManifestXmlFile, MatrixXmlFile};
