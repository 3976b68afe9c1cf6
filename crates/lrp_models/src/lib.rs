//! # lrp_models
//!
//! The bidirectional LSTM classifier whose decisions are explained.
//!
//! This crate provides:
//! - [`WeightBundle`] - immutable, shape-checked pretrained weights
//! - [`encode`] - vocabulary indices to forward and time-reversed embeddings
//! - [`run_forward`] - both recurrences with every activation cached
//! - [`BiLstm`] - a shareable classifier facade over the above
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lrp_core::LstmShape;
//! use lrp_models::{BiLstm, WeightBundle};
//!
//! let weights = WeightBundle::random(LstmShape::new(20, 4, 3, 2), 42, 0.5).unwrap();
//! let model = BiLstm::new(Arc::new(weights));
//! let cache = model.forward(&[3, 1, 4, 1, 5]).unwrap();
//! assert_eq!(cache.scores().dim(), (5, 2));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoder;
pub mod forward;
pub mod model;
pub mod weights;

pub use encoder::{encode, EncodedInput, RecurrentState, StateBuffer};
pub use forward::{run_forward, ActivationCache, DirectionCache};
pub use model::BiLstm;
pub use weights::{DirectionWeights, WeightBundle, EMBEDDINGS_KEY};
