//! # lrp_core
//!
//! Core types for explaining bidirectional LSTM classifiers with layer-wise
//! relevance propagation.
//!
//! This crate provides:
//! - [`LstmShape`] for the dimensions shared by all weight matrices
//! - [`Gate`] and [`Direction`] describing the stacked gate layout
//! - [`LrpConfig`] holding the decomposition rule parameters
//! - Error types and common utilities
//!
//! ## Gate Convention
//!
//! Gate matrices stack four blocks of `d` rows along their first axis, in the
//! order input, candidate, forget, output. The candidate block uses `tanh`,
//! the other three use the logistic sigmoid.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod gate;
mod shape;

pub use config::LrpConfig;
pub use error::{LrpError, Result};
pub use gate::{sigmoid, Direction, Gate};
pub use shape::LstmShape;
