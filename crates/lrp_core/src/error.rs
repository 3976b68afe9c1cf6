//! Error types for lrp_core.

use thiserror::Error;

/// Result type alias using [`LrpError`].
pub type Result<T> = std::result::Result<T, LrpError>;

/// Errors raised by the relevance propagation workspace.
///
/// Every variant is a precondition violation: operations fail fast and never
/// return partial results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LrpError {
    /// Weight matrices or vectors have disagreeing dimensions.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// An index (vocabulary entry, word position, class, mask position) is out of range.
    #[error("{what} index {index} out of range (valid range {lower}..{upper})")]
    IndexOutOfRange {
        /// Which kind of index was rejected.
        what: &'static str,
        /// The rejected index.
        index: usize,
        /// Inclusive lower bound of the valid range.
        lower: usize,
        /// Exclusive upper bound of the valid range.
        upper: usize,
    },

    /// A numeric parameter is outside its valid domain.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LrpError {
    /// Build an [`LrpError::IndexOutOfRange`] for a zero-based index.
    pub fn out_of_range(what: &'static str, index: usize, upper: usize) -> Self {
        Self::IndexOutOfRange {
            what,
            index,
            lower: 0,
            upper,
        }
    }

    /// Check that `index < upper`.
    pub fn check_index(what: &'static str, index: usize, upper: usize) -> Result<()> {
        if index < upper {
            Ok(())
        } else {
            Err(Self::out_of_range(what, index, upper))
        }
    }
}
