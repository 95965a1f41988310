//! Error types surfaced by the node builder and the mutable-node editor.
//!
//! Per the core's error-handling policy, these are the only failures the
//! crate ever returns as `Result::Err`: everything else (a mapping that
//! can't align, a pattern that doesn't match) is represented as data, not as
//! an error.

use core::fmt;

/// A child passed to [`crate::node::Type::build`] did not satisfy that
/// type's child descriptors, or the data payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    /// Too few children were supplied for the type's descriptor list.
    TooFewChildren {
        /// The type being built.
        type_name: Box<str>,
        /// Number of required (non-optional) child slots.
        required: usize,
        /// Number of children actually supplied.
        got: usize,
    },

    /// More children were supplied than the type's descriptor list allows.
    TooManyChildren {
        /// The type being built.
        type_name: Box<str>,
        /// Maximum number of child slots.
        max: usize,
        /// Number of children actually supplied.
        got: usize,
    },

    /// A child's type does not belong to the group required by the
    /// corresponding [`crate::node::ChildDescriptor`].
    WrongChildType {
        /// The type being built.
        type_name: Box<str>,
        /// Index of the offending child.
        index: usize,
        /// The group name the child was required to belong to.
        expected_group: Box<str>,
        /// The child's actual type name.
        actual_type: Box<str>,
    },

    /// The data payload was rejected by the type (e.g. malformed for a
    /// type that expects structured data).
    InvalidData {
        /// The type being built.
        type_name: Box<str>,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::TooFewChildren {
                type_name,
                required,
                got,
            } => write!(
                f,
                "{type_name}: too few children: expected at least {required}, got {got}"
            ),
            BuildError::TooManyChildren {
                type_name,
                max,
                got,
            } => write!(
                f,
                "{type_name}: too many children: expected at most {max}, got {got}"
            ),
            BuildError::WrongChildType {
                type_name,
                index,
                expected_group,
                actual_type,
            } => write!(
                f,
                "{type_name}: child {index} must belong to group '{expected_group}', got '{actual_type}'"
            ),
            BuildError::InvalidData { type_name } => {
                write!(f, "{type_name}: rejected data payload")
            }
        }
    }
}

impl core::error::Error for BuildError {}
