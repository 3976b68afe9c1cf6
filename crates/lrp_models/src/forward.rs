//! Cached forward pass of the bidirectional LSTM.

use ndarray::{s, Array1, Array2, ArrayView1};

use lrp_core::{Direction, Gate, LrpError, Result};

use crate::encoder::{EncodedInput, RecurrentState};
use crate::weights::{DirectionWeights, WeightBundle};

/// Every intermediate tensor of one direction's recurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionCache {
    /// Gate pre-activations, `T × 4d`.
    pub gates_pre: Array2<f64>,
    /// Gate activations, `T × 4d`.
    pub gates: Array2<f64>,
    /// Hidden and cell states, `(T + 1) × d` with the initial-state slot last.
    pub state: RecurrentState,
}

impl DirectionCache {
    fn hidden_dim(&self) -> usize {
        self.state.h.width()
    }

    /// Activation of `gate` at timestep `t`.
    pub fn gate(&self, t: usize, gate: Gate) -> ArrayView1<'_, f64> {
        self.gates.slice(s![t, gate.block(self.hidden_dim())])
    }

    /// Pre-activation of `gate` at timestep `t`.
    pub fn gate_pre(&self, t: usize, gate: Gate) -> ArrayView1<'_, f64> {
        self.gates_pre.slice(s![t, gate.block(self.hidden_dim())])
    }
}

/// Output of [`run_forward`]: class scores plus both directions' caches.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationCache {
    left: DirectionCache,
    right: DirectionCache,
    scores: Array2<f64>,
}

impl ActivationCache {
    /// Cache of one direction.
    #[must_use]
    pub fn direction(&self, direction: Direction) -> &DirectionCache {
        match direction {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    /// Class scores for every timestep, `T × C`.
    #[must_use]
    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    /// Class scores at timestep `t`.
    pub fn score(&self, t: usize) -> ArrayView1<'_, f64> {
        self.scores.row(t)
    }

    /// Sequence length `T`.
    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.scores.nrows()
    }

    /// Highest-scoring class at timestep `t` (first one on ties).
    ///
    /// Scores are ordered with [`f64::total_cmp`], so a NaN score ranks above
    /// every number and a diverged row reports the NaN class.
    pub fn predicted_class(&self, t: usize) -> Result<usize> {
        LrpError::check_index("timestep", t, self.seq_len())?;
        let (best, _) = self
            .scores
            .row(t)
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best, max), (class, &score)| {
                if score.total_cmp(&max).is_gt() {
                    (class, score)
                } else {
                    (best, max)
                }
            });
        Ok(best)
    }
}

/// Run both directional recurrences over `encoded` and cache every activation.
///
/// The class score at timestep `t` combines the left hidden state at `t` with
/// the right hidden state stored at the same index `t`; the right state is not
/// mirrored back to forward time before projection.
///
/// # Errors
///
/// Returns [`LrpError::ShapeMismatch`] if the input embedding size differs
/// from the weights'.
pub fn run_forward(weights: &WeightBundle, encoded: &EncodedInput) -> Result<ActivationCache> {
    let shape = weights.shape();
    if encoded.embed_dim() != shape.embed_dim() {
        return Err(LrpError::ShapeMismatch(format!(
            "input has embedding size {}, weights expect {}",
            encoded.embed_dim(),
            shape.embed_dim()
        )));
    }

    let left = recur(weights.direction(Direction::Left), encoded, Direction::Left);
    let right = recur(weights.direction(Direction::Right), encoded, Direction::Right);

    let why_left = &weights.direction(Direction::Left).why;
    let why_right = &weights.direction(Direction::Right).why;
    let t_len = encoded.seq_len();
    let mut scores = Array2::zeros((t_len, shape.n_classes()));
    for t in 0..t_len {
        let y_left = why_left.dot(&left.state.h.row(t));
        let y_right = why_right.dot(&right.state.h.row(t));
        scores.row_mut(t).assign(&(y_left + y_right));
    }

    tracing::debug!(seq_len = t_len, "forward pass complete");
    Ok(ActivationCache {
        left,
        right,
        scores,
    })
}

fn recur(
    weights: &DirectionWeights,
    encoded: &EncodedInput,
    direction: Direction,
) -> DirectionCache {
    let x = encoded.inputs(direction);
    let d = weights.whh.ncols();
    let t_len = encoded.seq_len();

    let mut gates_pre = Array2::zeros((t_len, Gate::COUNT * d));
    let mut gates = Array2::zeros((t_len, Gate::COUNT * d));
    let mut state = encoded.initial_state(d);

    for t in 0..t_len {
        let pre: Array1<f64> =
            weights.wxh.dot(&x.row(t)) + weights.whh.dot(&state.h.prev(t)) + &weights.bhh;
        let mut act = pre.clone();
        for gate in Gate::ALL {
            act.slice_mut(s![gate.block(d)])
                .mapv_inplace(|v| gate.activate(v));
        }

        let i = act.slice(s![Gate::Input.block(d)]);
        let g = act.slice(s![Gate::Candidate.block(d)]);
        let f = act.slice(s![Gate::Forget.block(d)]);
        let o = act.slice(s![Gate::Output.block(d)]);

        let c_prev = state.c.prev(t);
        let c = &f * &c_prev + &(&i * &g);
        let h = &o * &c.mapv(f64::tanh);

        state.c.row_mut(t).assign(&c);
        state.h.row_mut(t).assign(&h);
        gates_pre.row_mut(t).assign(&pre);
        gates.row_mut(t).assign(&act);
    }

    DirectionCache {
        gates_pre,
        gates,
        state,
    }
}
