//! Errors raised while building equations from parameters.

use pfield_core::{ErrorKind, PdeType};
use thiserror::Error;

/// An equation could not be built for a field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EquationError {
    /// The model cannot drive a field of this PDE type.
    #[error("model '{model}' cannot govern {pde_type} field '{field}'")]
    UnsupportedPdeType {
        /// Model name.
        model: &'static str,
        /// Field name.
        field: String,
        /// The field's PDE type.
        pde_type: PdeType,
    },

    /// The model is scalar-only but the field is a vector.
    #[error("model '{model}' only governs scalar fields, '{field}' has {components} components")]
    RankMismatch {
        /// Model name.
        model: &'static str,
        /// Field name.
        field: String,
        /// Components of the field.
        components: usize,
    },

    /// A coupling names a field that was not declared.
    #[error("model '{model}' references unknown field '{name}'")]
    UnknownField {
        /// Model name.
        model: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// A coefficient is non-finite or out of range.
    #[error("model '{model}': invalid {parameter} = {value}")]
    InvalidParameter {
        /// Model name.
        model: &'static str,
        /// Parameter name.
        parameter: &'static str,
        /// The rejected value.
        value: f64,
    },
}

impl EquationError {
    /// Classification for the driver.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}
