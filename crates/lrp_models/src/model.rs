//! Bidirectional LSTM classifier facade.

use std::sync::Arc;

use lrp_core::{LstmShape, Result};

use crate::encoder::{encode, EncodedInput};
use crate::forward::{run_forward, ActivationCache};
use crate::weights::WeightBundle;

/// A pretrained bidirectional LSTM sequence classifier.
///
/// Cloning is cheap: the weights are shared and never mutated. Every call
/// recomputes its caches from scratch and returns them by value, so one
/// instance can serve any number of threads.
#[derive(Debug, Clone)]
pub struct BiLstm {
    weights: Arc<WeightBundle>,
}

impl BiLstm {
    /// Wrap a weight bundle.
    pub fn new(weights: Arc<WeightBundle>) -> Self {
        Self { weights }
    }

    /// The shared weights.
    #[must_use]
    pub fn weights(&self) -> &Arc<WeightBundle> {
        &self.weights
    }

    /// Shared dimensions of the network.
    #[must_use]
    pub fn shape(&self) -> LstmShape {
        self.weights.shape()
    }

    /// Encode `indices`, optionally zeroing the embeddings at `mask`.
    pub fn encode(&self, indices: &[usize], mask: Option<&[usize]>) -> Result<EncodedInput> {
        encode(&self.weights, indices, mask)
    }

    /// Encode `indices` and run the cached forward pass.
    pub fn forward(&self, indices: &[usize]) -> Result<ActivationCache> {
        let encoded = self.encode(indices, None)?;
        run_forward(&self.weights, &encoded)
    }

    /// Predicted class at the last position of the sequence.
    pub fn predict(&self, indices: &[usize]) -> Result<usize> {
        let cache = self.forward(indices)?;
        cache.predicted_class(cache.seq_len() - 1)
    }
}
