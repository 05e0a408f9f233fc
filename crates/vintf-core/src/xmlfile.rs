//! Auxiliary XML-file descriptors carried by manifests and matrices
//!
//! Only the descriptors and their merge rules live here; reading and writing
//! the files themselves is the caller's business.

use serde::{Deserialize, Serialize};
use vintf_version::{Version, VersionRange};

/// An auxiliary XML file a manifest provides, by name and version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManifestXmlFile {
    pub name: String,
    pub version: Version,
}

impl ManifestXmlFile {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        ManifestXmlFile {
            name: name.into(),
            version,
        }
    }
}

/// An auxiliary XML file a matrix requires, by name and version range.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatrixXmlFile {
    pub name: String,
    pub version_range: VersionRange,
    pub optional: bool,
}

impl MatrixXmlFile {
    pub fn new(name: impl Into<String>, version_range: VersionRange, optional: bool) -> Self {
        MatrixXmlFile {
            name: name.into(),
            version_range,
            optional,
        }
    }
}
