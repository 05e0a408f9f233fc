//! The satisfiability engine: does a manifest satisfy a compatibility matrix?

use std::collections::BTreeSet;

use vintf_version::{Version, VersionRange};

use crate::error::{Result, VintfError};
use crate::fqinstance::FqInstance;
use crate::manifest::Manifest;
use crate::matrix::{CompatibilityMatrix, MatrixHal};
use crate::types::SchemaType;

/// Render the requirement expression of one version range:
/// `a AND b`, parenthesized when asked and compound.
fn expand_instances_of_range(hal: &MatrixHal, vr: &VersionRange, brace: bool) -> String {
    let mut s = String::new();
    let mut count = 0usize;
    hal.for_each_instance_of_range(vr, |leaf| {
        if count > 0 {
            s.push_str(" AND ");
        }
        s.push_str(&leaf.description());
        count += 1;
        true
    });
    if count == 0 {
        s = format!("@{}", vr);
    }
    if count >= 2 && brace {
        s = format!("({})", s);
    }
    s
}

/// Render the full requirement expression of one matrix entry: an OR across
/// version ranges, each branch an AND across its instances.
pub(crate) fn render_required_expression(hal: &MatrixHal) -> String {
    let ranges = hal.version_ranges();
    match ranges {
        [] => String::new(),
        [single] => expand_instances_of_range(hal, single, false),
        _ => ranges
            .iter()
            .map(|vr| expand_instances_of_range(hal, vr, true))
            .collect::<Vec<_>>()
            .join(" OR "),
    }
}

impl Manifest {
    /// One diagnostic block per required HAL this manifest does not satisfy.
    /// Evaluation continues past the first failure so the caller sees every
    /// problem in one pass.
    pub fn check_incompatible_hals(&self, matrix: &CompatibilityMatrix) -> Vec<String> {
        let mut problems = Vec::new();

        for hal in matrix.hals() {
            if hal.optional() {
                continue;
            }
            if !hal.applies_to_level(self.level()) {
                log::debug!(
                    "requirement {} does not apply to a level-{} manifest",
                    hal.name,
                    self.level()
                );
                continue;
            }

            let mut provided: BTreeSet<FqInstance> = BTreeSet::new();
            let mut descriptions: BTreeSet<String> = BTreeSet::new();
            let mut versions: BTreeSet<Version> = BTreeSet::new();
            for manifest_hal in self.get_hals(&hal.name) {
                manifest_hal.for_each_instance(|instance| {
                    provided.insert(instance.fq_instance());
                    descriptions.insert(instance.description_without_package());
                    true
                });
                versions.extend(manifest_hal.all_versions());
            }

            if hal.is_compatible(&provided, &versions) {
                continue;
            }
            log::debug!("required HAL {} is not satisfied", hal.name);
            let provided_text = if descriptions.is_empty() {
                "none".to_string()
            } else {
                descriptions.iter().cloned().collect::<Vec<_>>().join(", ")
            };
            problems.push(format!(
                "{}:\n    required: {}\n    provided: {}",
                hal.name,
                render_required_expression(hal),
                provided_text
            ));
        }

        problems
    }

    /// The top-level predicate: whether this manifest satisfies the matrix.
    ///
    /// A device manifest is checked against a framework matrix and vice
    /// versa. All unsatisfied requirements accumulate into one
    /// [`VintfError::Incompatible`] report; the check never stops at the
    /// first failure.
    pub fn check_compatibility(&self, matrix: &CompatibilityMatrix) -> Result<()> {
        let expected = match self.schema_type() {
            SchemaType::Device => SchemaType::Framework,
            SchemaType::Framework => SchemaType::Device,
        };
        if matrix.schema_type() != expected {
            return Err(VintfError::TypeMismatch {
                expected,
                found: matrix.schema_type(),
            });
        }

        let mut problems = self.check_incompatible_hals(matrix);

        match self.schema_type() {
            SchemaType::Device => {
                self.check_sepolicy(matrix, &mut problems);
                self.check_kernel(matrix, &mut problems);
            }
            SchemaType::Framework => {
                self.check_vendor_ndk(matrix, &mut problems);
                self.check_system_sdk(matrix, &mut problems);
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(VintfError::Incompatible(problems.join("\n")))
        }
    }

    fn check_sepolicy(&self, matrix: &CompatibilityMatrix, problems: &mut Vec<String>) {
        let Some(required) = matrix.sepolicy() else {
            return;
        };
        if required.version_ranges().is_empty() {
            return;
        }
        let Some(version) = self.sepolicy_version() else {
            problems.push("manifest does not declare a sepolicy version".to_string());
            return;
        };
        if !required
            .version_ranges()
            .iter()
            .any(|range| range.supported_by(&version))
        {
            let acceptable: Vec<String> = required
                .version_ranges()
                .iter()
                .map(ToString::to_string)
                .collect();
            problems.push(format!(
                "sepolicy version {} does not satisfy the required versions {}",
                version,
                acceptable.join(", ")
            ));
        }
    }

    fn check_kernel(&self, matrix: &CompatibilityMatrix, problems: &mut Vec<String>) {
        let Some(kernel) = self.kernel() else {
            return;
        };
        if matrix.kernels().is_empty() {
            return;
        }
        if let Err(e) = kernel.match_kernel_requirements(matrix.kernels()) {
            problems.push(e);
        }
    }

    fn check_vendor_ndk(&self, matrix: &CompatibilityMatrix, problems: &mut Vec<String>) {
        let Some(required) = matrix.vendor_ndk() else {
            return;
        };
        let Some(declared) = self
            .vendor_ndks()
            .iter()
            .find(|v| v.version == required.version)
        else {
            let declared: Vec<&str> = self.vendor_ndks().iter().map(|v| v.version.as_str()).collect();
            problems.push(format!(
                "vendor NDK version {} is required but the manifest declares [{}]",
                required.version,
                declared.join(", ")
            ));
            return;
        };
        let missing: Vec<&str> = required
            .libraries
            .difference(&declared.libraries)
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            problems.push(format!(
                "vendor NDK version {} lacks required libraries: {}",
                required.version,
                missing.join(", ")
            ));
        }
    }

    fn check_system_sdk(&self, matrix: &CompatibilityMatrix, problems: &mut Vec<String>) {
        let missing: Vec<&str> = matrix
            .system_sdk()
            .difference(self.system_sdk())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            problems.push(format!(
                "system SDK versions are missing: {}",
                missing.join(", ")
            ));
        }
    }

    /// Provided instances no requirement leaf of the matrix matches, by
    /// description. Useful for flagging inventory the framework will never
    /// look at.
    pub fn check_unused_hals(&self, matrix: &CompatibilityMatrix) -> BTreeSet<String> {
        let mut unused = BTreeSet::new();
        self.for_each_instance(|instance| {
            let used = matrix.match_instance(
                instance.format(),
                instance.package(),
                instance.version(),
                instance.interface(),
                instance.instance(),
            );
            if !used {
                unused.insert(instance.description());
            }
            true
        });
        unused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HalFormat;

    #[test]
    fn test_render_required_expression() {
        let mut hal = MatrixHal::new(
            HalFormat::Hidl,
            "android.hardware.foo",
            vec![VersionRange::new(1, 2, 3)],
            false,
        );
        hal.add_instance("IFoo", "default");
        assert_eq!(render_required_expression(&hal), "@1.2-3::IFoo/default");

        hal.add_instance("IBar", "default");
        assert_eq!(
            render_required_expression(&hal),
            "@1.2-3::IBar/default AND @1.2-3::IFoo/default"
        );

        hal.insert_version_ranges(&[VersionRange::new(2, 0, 0)]);
        assert_eq!(
            render_required_expression(&hal),
            "(@1.2-3::IBar/default AND @1.2-3::IFoo/default) OR \
             (@2.0::IBar/default AND @2.0::IFoo/default)"
        );
    }

    #[test]
    fn test_render_version_only() {
        let hal = MatrixHal::new(
            HalFormat::Native,
            "netutils-wrapper",
            vec![VersionRange::single(1, 0)],
            false,
        );
        assert_eq!(render_required_expression(&hal), "@1.0");
    }
}
