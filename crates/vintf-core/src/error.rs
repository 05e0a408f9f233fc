use thiserror::Error;

use crate::types::SchemaType;

#[derive(Error, Debug)]
pub enum VintfError {
    /// One or more required constraints are not met. The message carries one
    /// diagnostic block per failing requirement.
    #[error("incompatible:\n{0}")]
    Incompatible(String),

    /// Two fragments declare contradictory values for a field that cannot be
    /// merged. Fatal to the merge or combination that raised it.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An instance-name pattern failed to compile.
    #[error("invalid instance pattern {pattern:?}: {source}")]
    MalformedPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The same instance-name pattern was declared twice for one interface.
    #[error("duplicate instance pattern {pattern:?} for interface {interface}")]
    DuplicatePattern { interface: String, pattern: String },

    /// A descriptor of the wrong schema type was passed to an operation.
    #[error("expected a {expected} descriptor, got a {found} descriptor")]
    TypeMismatch {
        expected: SchemaType,
        found: SchemaType,
    },

    /// A HAL entry violates a structural invariant of its descriptor.
    #[error("invalid HAL {name}: {reason}")]
    InvalidHal { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, VintfError>;
