//! Error types for resource request handling.

use thiserror::Error;

/// Errors raised while parsing a byte-suffixed memory quantity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("malformed quantity: {0:?}")]
    Malformed(String),

    #[error("unrecognized unit suffix in {0:?}")]
    UnknownUnit(String),
}

/// Errors raised while ingesting named resource values into a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid value {value:?} for resource {name}: not a number")]
    InvalidCount { name: String, value: String },

    #[error("invalid memory quantity: {0}")]
    Quantity(#[from] QuantityError),
}
