//! Vendor NDK version/library contracts

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One vendor NDK snapshot: a release version and the libraries it provides
/// (framework manifest) or requires (device matrix).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorNdk {
    pub version: String,
    pub libraries: BTreeSet<String>,
}

impl VendorNdk {
    pub fn new(version: impl Into<String>) -> Self {
        VendorNdk {
            version: version.into(),
            libraries: BTreeSet::new(),
        }
    }

    pub fn with_libraries<I, S>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libraries = libraries.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for VendorNdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}
