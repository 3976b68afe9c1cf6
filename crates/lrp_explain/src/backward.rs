//! Exact gradients by backpropagation through time.
//!
//! Used as an independent numeric reference for the relevance scores; the
//! relevance propagator never reads these gradients.

use ndarray::{s, Array1, Array2};

use lrp_core::{Direction, Gate, Result};
use lrp_models::{
    encode, run_forward, ActivationCache, DirectionCache, DirectionWeights, EncodedInput,
    StateBuffer, WeightBundle,
};

use crate::window::{one_hot, SeedWindow};

/// Gradients of one class score with respect to the input embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    /// Gradient through the left direction, `T × e`.
    pub left: Array2<f64>,
    /// Gradient through the right direction, `T × e`, in forward time order.
    pub right: Array2<f64>,
    /// The class score that was differentiated.
    pub target_score: f64,
}

impl Gradients {
    /// Gradient through both directions, `T × e`.
    #[must_use]
    pub fn combined(&self) -> Array2<f64> {
        &self.left + &self.right
    }
}

/// Rerun the forward pass on `indices` and differentiate the score of `class`
/// at `word_position` (1-based).
///
/// # Errors
///
/// [`lrp_core::LrpError::IndexOutOfRange`] for a vocabulary index,
/// word position or class outside its range.
pub fn run_backward(
    weights: &WeightBundle,
    indices: &[usize],
    word_position: usize,
    class: usize,
) -> Result<Gradients> {
    let encoded = encode(weights, indices, None)?;
    let cache = run_forward(weights, &encoded)?;
    backpropagate(weights, &encoded, &cache, word_position, class)
}

/// Differentiate through an existing forward pass of `encoded`.
pub fn backpropagate(
    weights: &WeightBundle,
    encoded: &EncodedInput,
    cache: &ActivationCache,
    word_position: usize,
    class: usize,
) -> Result<Gradients> {
    let window = SeedWindow::new(word_position, encoded.seq_len())?;
    let ds = one_hot(class, weights.shape().n_classes())?;
    tracing::debug!(
        seq_len = encoded.seq_len(),
        word_position,
        class,
        "backpropagating class score"
    );

    let [left, right] = Direction::BOTH.map(|direction| {
        let w = weights.direction(direction);
        let seed = w.why.t().dot(&ds);
        bptt(w, cache.direction(direction), encoded, direction, &window, &seed)
    });

    Ok(Gradients {
        left,
        right: right.slice(s![..;-1, ..]).to_owned(),
        target_score: cache.score(window.score_step())[class],
    })
}

fn bptt(
    w: &DirectionWeights,
    cache: &DirectionCache,
    encoded: &EncodedInput,
    direction: Direction,
    window: &SeedWindow,
    seed: &Array1<f64>,
) -> Array2<f64> {
    let t_len = encoded.seq_len();
    let d = w.whh.ncols();

    let mut dh = StateBuffer::zeros(t_len, d);
    let mut dc = StateBuffer::zeros(t_len, d);
    let mut dx = Array2::zeros((t_len, encoded.embed_dim()));
    dh.row_mut(window.seed_slot(direction)).assign(seed);

    for t in window.steps(direction) {
        let prev = dh.prev_slot(t);
        let tanh_c = cache.state.c.row(t).mapv(f64::tanh);
        let dh_t = dh.row(t).to_owned();

        let d_output = &dh_t * &tanh_c;
        let dc_t = &dc.row(t)
            + &((&dh_t * &cache.gate(t, Gate::Output)) * &tanh_c.mapv(|v| 1.0 - v * v));
        let d_forget = &dc_t * &cache.state.c.prev(t);
        let d_input = &dc_t * &cache.gate(t, Gate::Candidate);
        let d_candidate = &dc_t * &cache.gate(t, Gate::Input);
        dc.row_mut(prev).assign(&(&dc_t * &cache.gate(t, Gate::Forget)));
        dc.row_mut(t).assign(&dc_t);

        let mut d_pre = Array1::<f64>::zeros(Gate::COUNT * d);
        for (gate, d_gate) in [
            (Gate::Input, d_input),
            (Gate::Candidate, d_candidate),
            (Gate::Forget, d_forget),
            (Gate::Output, d_output),
        ] {
            let local = cache
                .gate(t, gate)
                .mapv(|y| gate.derivative_from_output(y));
            d_pre.slice_mut(s![gate.block(d)]).assign(&(d_gate * &local));
        }

        dh.row_mut(prev).assign(&w.whh.t().dot(&d_pre));
        dx.row_mut(t).assign(&w.wxh.t().dot(&d_pre));
    }

    dx
}
