//! Error types for catalogue lookups in cosmoid-types.

use thiserror::Error;

/// Errors raised when translating between symbolic operations and
/// characteristic identifiers.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LookupError {
    /// The symbolic operation name is not in the catalogue.
    #[error("Unknown characteristic operation: {0}")]
    UnknownOperation(String),

    /// The identifier is a valid UUID but no operation maps to it.
    #[error("Unknown characteristic UUID: {0}")]
    UnknownUuid(String),

    /// The identifier could not be parsed as a UUID at all.
    #[error("Invalid characteristic UUID: {0}")]
    InvalidUuid(String),
}

/// Result type alias using cosmoid-types' LookupError type.
pub type LookupResult<T> = std::result::Result<T, LookupError>;
