//! # lrp
//!
//! Layer-wise relevance propagation for bidirectional LSTM sequence
//! classifiers.
//!
//! Given pretrained weights and a sequence of word indices, lrp explains the
//! score of a chosen class at a chosen position by distributing it over the
//! input embeddings:
//!
//! - **Model**: shape-checked weights, embedding lookup, cached forward pass
//! - **Relevance**: epsilon-rule propagation through both recurrences
//! - **Gradients**: exact backpropagation through time as a reference
//! - **Explanations**: attribution maps, deleted-word experiments, parallel
//!   per-position sweeps
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use lrp::prelude::*;
//!
//! let weights = WeightBundle::random(LstmShape::new(50, 8, 6, 3), 42, 0.3)?;
//! let explainer = Explainer::new(Arc::new(weights))
//!     .with_config(LrpConfig::default().with_eps(1e-3))?;
//!
//! let sentence = [12, 7, 33, 2];
//! let explanation = explainer.explain_prediction(&sentence)?;
//! for (position, score) in explanation.map.top_positions(2) {
//!     println!("word {position}: {score:.4}");
//! }
//! # Ok::<(), lrp::core::LrpError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub use lrp_core as core;
pub use lrp_explain as explain;
pub use lrp_models as models;

/// Prelude module for convenient imports.
///
/// ```rust
/// use lrp::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use lrp_core::{Direction, Gate, LrpConfig, LrpError, LstmShape, Result};

    // Models
    pub use lrp_models::{encode, run_forward, ActivationCache, BiLstm, EncodedInput, WeightBundle};

    // Explanations
    pub use lrp_explain::{
        input_gradient, run_backward, run_relevance, AttributionMap, AttributionMethod, Explainer,
        Gradients, Relevance, RelevanceExplanation, RelevanceRule,
    };
}
