//! # lrp_explain
//!
//! Explanations for bidirectional LSTM classifiers: which input words drove a
//! class score.
//!
//! This crate provides:
//! - [`RelevanceRule`] - the epsilon rule for redistributing relevance through
//!   a linear map
//! - [`run_backward`] - exact gradients by backpropagation through time
//! - [`run_relevance`] - layer-wise relevance propagation through both
//!   recurrences
//! - [`AttributionMap`] - per-position attribution summaries
//! - [`Explainer`] - a shareable session tying the above to one set of weights
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lrp_core::LstmShape;
//! use lrp_explain::Explainer;
//! use lrp_models::WeightBundle;
//!
//! let weights = WeightBundle::random(LstmShape::new(20, 4, 3, 2), 7, 0.5).unwrap();
//! let explainer = Explainer::new(Arc::new(weights));
//! let explanation = explainer.explain(&[3, 1, 4, 1, 5], 5, 0).unwrap();
//! let heatmap = explanation.map.per_position();
//! assert_eq!(heatmap.len(), 5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod attribution;
mod backward;
mod explainer;
mod linear;
mod relevance;
mod window;

pub use attribution::{input_gradient, AttributionMap, AttributionMethod};
pub use backward::{backpropagate, run_backward, Gradients};
pub use explainer::{Explainer, RelevanceExplanation};
pub use linear::{conservation_residual, stabilizer_sign, RelevanceRule};
pub use relevance::{propagate_relevance, run_relevance, DirectionRelevance, Relevance};
pub use window::{one_hot, SeedWindow};
