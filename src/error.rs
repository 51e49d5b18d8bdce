use thiserror::Error;

/// Errors returned by clustering and matching routines in this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Vectors have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// A vector has no components at all.
    #[error("embedding vector has zero length")]
    EmptyVector,

    /// A vector cannot take part in a similarity computation.
    ///
    /// Zero-norm or non-finite embeddings mean the upstream extractor failed.
    #[error("degenerate embedding vector: {reason}")]
    DegenerateVector {
        /// What is wrong with the vector.
        reason: &'static str,
    },

    /// Number of labels does not match the number of embeddings.
    #[error("label count mismatch: {embeddings} embeddings, {labels} labels")]
    LabelCountMismatch {
        /// Number of embeddings supplied.
        embeddings: usize,
        /// Number of labels supplied.
        labels: usize,
    },
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed call-level input, detected before or at first use.
    InvalidArgument,
    /// Zero-norm or non-finite embedding encountered while comparing vectors.
    DegenerateVector,
}

impl Error {
    /// The kind of failure, independent of the details carried by the variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DegenerateVector { .. } => ErrorKind::DegenerateVector,
            Error::EmptyInput
            | Error::InvalidParameter { .. }
            | Error::DimensionMismatch { .. }
            | Error::EmptyVector
            | Error::LabelCountMismatch { .. } => ErrorKind::InvalidArgument,
        }
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
