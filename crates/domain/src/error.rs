//! Domain error types.

use thiserror::Error;

/// Malformed input rejected by a value-object constructor, before any
/// aggregate is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be between {min} and {max} characters")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{field} contains invalid characters")]
    Characters { field: &'static str },

    #[error("Email format is invalid: {0}")]
    EmailFormat(String),

    #[error("Card number must be exactly 16 digits")]
    CardNumberFormat,

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
