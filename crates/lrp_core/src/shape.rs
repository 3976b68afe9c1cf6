//! Bidirectional LSTM shape metadata.

use serde::{Deserialize, Serialize};

use crate::error::{LrpError, Result};
use crate::gate::Gate;

/// Dimensions shared by every matrix of a bidirectional LSTM classifier.
///
/// - `V`: vocabulary size (rows of the embedding matrix)
/// - `e`: embedding dimension
/// - `d`: hidden size of each direction
/// - `C`: number of classes
///
/// # Example
///
/// ```rust
/// use lrp_core::LstmShape;
///
/// let shape = LstmShape::new(100, 8, 16, 5);
/// assert_eq!(shape.gate_dim(), 64);
/// assert_eq!(shape.candidate_fan_in(), 24);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LstmShape {
    vocab_size: usize,
    embed_dim: usize,
    hidden_dim: usize,
    n_classes: usize,
}

impl LstmShape {
    /// Create a new shape.
    #[must_use]
    pub const fn new(vocab_size: usize, embed_dim: usize, hidden_dim: usize, n_classes: usize) -> Self {
        Self {
            vocab_size,
            embed_dim,
            hidden_dim,
            n_classes,
        }
    }

    /// Vocabulary size `V`.
    #[must_use]
    pub const fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Embedding dimension `e`.
    #[must_use]
    pub const fn embed_dim(&self) -> usize {
        self.embed_dim
    }

    /// Hidden size `d` of each direction.
    #[must_use]
    pub const fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// Number of classes `C`.
    #[must_use]
    pub const fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Height of the stacked gate matrices (`4d`).
    #[must_use]
    pub const fn gate_dim(&self) -> usize {
        Gate::COUNT * self.hidden_dim
    }

    /// Number of units feeding the candidate gate (`d + e`).
    #[must_use]
    pub const fn candidate_fan_in(&self) -> usize {
        self.hidden_dim + self.embed_dim
    }

    /// Reject shapes with a zero dimension.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("vocab_size", self.vocab_size),
            ("embed_dim", self.embed_dim),
            ("hidden_dim", self.hidden_dim),
            ("n_classes", self.n_classes),
        ];
        for (name, value) in dims {
            if value == 0 {
                return Err(LrpError::ShapeMismatch(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for LstmShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(V={}, e={}, d={}, C={})",
            self.vocab_size, self.embed_dim, self.hidden_dim, self.n_classes
        )
    }
}
