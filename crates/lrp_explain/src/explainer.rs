//! Explanation session over a shared classifier.

use std::sync::Arc;

use rayon::prelude::*;

use lrp_core::{LrpConfig, Result};
use lrp_models::{encode, run_forward, ActivationCache, WeightBundle};

use crate::attribution::{input_gradient, AttributionMap, AttributionMethod};
use crate::backward::{backpropagate, Gradients};
use crate::linear::RelevanceRule;
use crate::relevance::{propagate_relevance, Relevance};
use crate::window::one_hot;

/// Relevance of one class score, summarized for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceExplanation {
    /// Combined left and right input relevance.
    pub map: AttributionMap,
    /// Relevance absorbed by the initial states.
    pub residual: f64,
    /// The explained class score.
    pub target_score: f64,
}

impl RelevanceExplanation {
    fn from_relevance(relevance: &Relevance, word_position: usize, class: usize) -> Self {
        Self {
            map: AttributionMap::new(relevance.combined(), AttributionMethod::Relevance)
                .with_target_class(class)
                .with_word_position(word_position),
            residual: relevance.residual,
            target_score: relevance.target_score,
        }
    }

    /// Input relevance plus residual; equals the target score up to the
    /// stabilizer when bias relevance is redistributed.
    #[must_use]
    pub fn accounted(&self) -> f64 {
        self.map.total() + self.residual
    }
}

/// Explains decisions of one pretrained bidirectional LSTM.
///
/// Holds the weights read-only; every call builds its own caches, so an
/// `Explainer` can be shared freely between threads.
#[derive(Debug, Clone)]
pub struct Explainer {
    weights: Arc<WeightBundle>,
    config: LrpConfig,
}

impl Explainer {
    /// Create an explainer with the default relevance configuration.
    pub fn new(weights: Arc<WeightBundle>) -> Self {
        Self {
            weights,
            config: LrpConfig::default(),
        }
    }

    /// Replace the relevance configuration.
    ///
    /// # Errors
    ///
    /// [`lrp_core::LrpError::InvalidParameter`] if `config` does not validate.
    pub fn with_config(mut self, config: LrpConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// The relevance configuration.
    #[must_use]
    pub fn config(&self) -> &LrpConfig {
        &self.config
    }

    /// The shared weights.
    #[must_use]
    pub fn weights(&self) -> &Arc<WeightBundle> {
        &self.weights
    }

    /// Cached forward pass over `indices`.
    pub fn forward(&self, indices: &[usize]) -> Result<ActivationCache> {
        let encoded = encode(&self.weights, indices, None)?;
        run_forward(&self.weights, &encoded)
    }

    /// Gradients of the score of `class` at `word_position`.
    pub fn backward(
        &self,
        indices: &[usize],
        word_position: usize,
        class: usize,
    ) -> Result<Gradients> {
        crate::backward::run_backward(&self.weights, indices, word_position, class)
    }

    /// Relevance of the score of `class` at `word_position`.
    pub fn lrp(&self, indices: &[usize], word_position: usize, class: usize) -> Result<Relevance> {
        self.lrp_masked(indices, &[], word_position, class)
    }

    /// Relevance computed with the embeddings at `masked` positions zeroed.
    pub fn lrp_masked(
        &self,
        indices: &[usize],
        masked: &[usize],
        word_position: usize,
        class: usize,
    ) -> Result<Relevance> {
        let rule = RelevanceRule::from_config(&self.config)?;
        let mask = (!masked.is_empty()).then_some(masked);
        let encoded = encode(&self.weights, indices, mask)?;
        let cache = run_forward(&self.weights, &encoded)?;
        propagate_relevance(&self.weights, &encoded, &cache, word_position, class, &rule)
    }

    /// Combined relevance map for the score of `class` at `word_position`.
    pub fn explain(
        &self,
        indices: &[usize],
        word_position: usize,
        class: usize,
    ) -> Result<RelevanceExplanation> {
        let relevance = self.lrp(indices, word_position, class)?;
        Ok(RelevanceExplanation::from_relevance(&relevance, word_position, class))
    }

    /// Like [`Explainer::explain`], with the words at `masked` deleted.
    pub fn explain_masked(
        &self,
        indices: &[usize],
        masked: &[usize],
        word_position: usize,
        class: usize,
    ) -> Result<RelevanceExplanation> {
        let relevance = self.lrp_masked(indices, masked, word_position, class)?;
        tracing::debug!(masked = masked.len(), "explained with deleted words");
        Ok(RelevanceExplanation::from_relevance(&relevance, word_position, class))
    }

    /// Explain the prediction at the last position: the highest-scoring class
    /// there is the target.
    pub fn explain_prediction(&self, indices: &[usize]) -> Result<RelevanceExplanation> {
        let cache = self.forward(indices)?;
        let word_position = cache.seq_len();
        let class = cache.predicted_class(word_position - 1)?;
        tracing::info!(word_position, class, "explaining predicted class");
        self.explain(indices, word_position, class)
    }

    /// One explanation of `class` per word position, computed in parallel and
    /// returned in position order.
    ///
    /// The sequence and class are validated before any work is scheduled, so
    /// an empty sequence fails instead of yielding no explanations.
    pub fn explain_all_positions(
        &self,
        indices: &[usize],
        class: usize,
    ) -> Result<Vec<RelevanceExplanation>> {
        RelevanceRule::from_config(&self.config)?;
        let encoded = encode(&self.weights, indices, None)?;
        one_hot(class, self.weights.shape().n_classes())?;
        (1..=encoded.seq_len())
            .into_par_iter()
            .map(|word_position| self.explain(indices, word_position, class))
            .collect()
    }

    /// Input × Gradient map of the score of `class` at `word_position`,
    /// taking the gradient through both directions.
    pub fn gradient_map(
        &self,
        indices: &[usize],
        word_position: usize,
        class: usize,
    ) -> Result<AttributionMap> {
        let encoded = encode(&self.weights, indices, None)?;
        let cache = run_forward(&self.weights, &encoded)?;
        let grads = backpropagate(&self.weights, &encoded, &cache, word_position, class)?;
        Ok(input_gradient(encoded.x(), &grads.combined())?
            .with_target_class(class)
            .with_word_position(word_position))
    }
}
