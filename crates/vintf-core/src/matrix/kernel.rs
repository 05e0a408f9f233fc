//! One kernel requirement block of a framework matrix

use serde::{Deserialize, Serialize};
use vintf_version::KernelVersion;

use crate::kernel::KernelConfig;

/// A kernel requirement: a minimum LTS version plus required configs,
/// optionally gated by `conditions`.
///
/// A block with no conditions is the unconditional baseline for its version
/// and must sort before the conditioned blocks of that version. A conditioned
/// block applies only when all of its conditions hold on the reported kernel
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixKernel {
    min_lts: KernelVersion,
    conditions: Vec<KernelConfig>,
    configs: Vec<KernelConfig>,
}

impl MatrixKernel {
    pub fn new(min_lts: KernelVersion, configs: Vec<KernelConfig>) -> Self {
        MatrixKernel {
            min_lts,
            conditions: Vec::new(),
            configs,
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<KernelConfig>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn min_lts(&self) -> &KernelVersion {
        &self.min_lts
    }

    pub fn conditions(&self) -> &[KernelConfig] {
        &self.conditions
    }

    pub fn configs(&self) -> &[KernelConfig] {
        &self.configs
    }
}
