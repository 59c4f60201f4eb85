//! Error types for BRBON operations

use thiserror::Error;

/// BRBON operation result type
pub type Result<T> = std::result::Result<T, BrbonError>;

/// BRBON operation errors
#[derive(Error, Debug)]
pub enum BrbonError {
    /// The portal no longer refers to a live location
    #[error("Invalid handle: portal target no longer exists")]
    InvalidHandle,

    /// Index is outside the container bounds
    #[error("Index {index} out of bounds (count={count})")]
    IndexOutOfBounds { index: usize, count: usize },

    /// Value, element or column type conflict
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Name exceeds the 245 byte UTF-8 limit
    #[error("Name too long: {0} bytes (max 245)")]
    NameTooLong(usize),

    /// Name is missing, duplicated or otherwise unusable
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Growth is disabled and the buffer has no room left
    #[error("Insufficient capacity: {required} bytes required, {available} available")]
    InsufficientCapacity { required: usize, available: usize },

    /// No table column with this name
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Structural check failed
    #[error("Malformed buffer at offset {offset:#x}: {reason}")]
    MalformedBuffer { offset: usize, reason: String },

    /// The item would sit deeper than a loadable buffer allows
    #[error("Nesting too deep: {depth} levels (max {max})")]
    NestingTooDeep { depth: usize, max: usize },

    /// A fixed byte count was requested below what the type needs
    #[error("Fixed size {requested} is smaller than the minimum of {minimum} bytes")]
    FixedSizeTooSmall { requested: usize, minimum: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl BrbonError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        BrbonError::MalformedBuffer {
            offset,
            reason: reason.into(),
        }
    }
}
