//! Error types for tensor contraction.

use thiserror::Error;

/// Errors reported synchronously at the driver entry point.
///
/// Every error is detected before the first write to the output tensor, so a
/// failed call leaves C unchanged. Internal invariant violations (communicator
/// misuse, loop-nest bookkeeping) are bugs and panic instead.
#[derive(Debug, Clone, Error)]
pub enum ContractError {
    /// A label is repeated within one index string.
    #[error("index '{label}' appears more than once in \"{indices}\"")]
    MalformedIndex { label: char, indices: String },

    /// A label appears in exactly one of A/B/C (no implicit reduction or
    /// broadcast).
    #[error("index '{label}' appears in only one operand")]
    UnmatchedIndex { label: char },

    /// A shared label has inconsistent lengths across operands.
    #[error("index '{label}' has length {expected} in one operand, {got} in another")]
    LengthMismatch {
        label: char,
        expected: usize,
        got: usize,
    },

    /// Tensor rank does not match the index string length.
    #[error("index string \"{indices}\" names {expected} axes, tensor has rank {got}")]
    ShapeError {
        indices: String,
        expected: usize,
        got: usize,
    },

    /// The output tensor's storage overlaps an input's.
    #[error("output storage overlaps operand {operand}")]
    AliasError { operand: char },

    /// An environment override could not be parsed or is out of range.
    #[error("invalid value \"{value}\" for {variable}")]
    ConfigError { variable: String, value: String },

    /// Packing scratch could not be allocated.
    #[error("failed to allocate {bytes} bytes of packing scratch")]
    OutOfMemory { bytes: usize },
}

impl ContractError {
    pub(crate) fn malformed(label: char, indices: &str) -> Self {
        Self::MalformedIndex {
            label,
            indices: indices.into(),
        }
    }

    pub(crate) fn shape(indices: &str, expected: usize, got: usize) -> Self {
        Self::ShapeError {
            indices: indices.into(),
            expected,
            got,
        }
    }

    pub(crate) fn config(variable: &str, value: impl Into<String>) -> Self {
        Self::ConfigError {
            variable: variable.into(),
            value: value.into(),
        }
    }
}

/// Result type for contraction operations.
pub type ContractResult<T> = core::result::Result<T, ContractError>;
