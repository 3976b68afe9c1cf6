//! Layer-wise relevance propagation through both recurrences.
//!
//! Relevance of one class score is pushed back through the output projection,
//! then step by step through the cell update and the candidate gate into the
//! input embeddings. The input, forget and output gates act as multiplicative
//! switches and receive no relevance.

use ndarray::{s, Array1, Array2};

use lrp_core::{Direction, Gate, LrpConfig, Result};
use lrp_models::{
    encode, run_forward, ActivationCache, DirectionCache, DirectionWeights, EncodedInput,
    StateBuffer, WeightBundle,
};

use crate::linear::RelevanceRule;
use crate::window::{one_hot, SeedWindow};

/// Every relevance tensor of one direction, indexed in that direction's time.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionRelevance {
    /// Relevance of the inputs, `T × e`.
    pub rx: Array2<f64>,
    /// Relevance of the hidden states, `(T + 1) × d`.
    pub rh: StateBuffer,
    /// Relevance of the cell states, `(T + 1) × d`.
    pub rc: StateBuffer,
    /// Relevance of the candidate gate, `T × d`.
    pub rg: Array2<f64>,
}

impl DirectionRelevance {
    /// Relevance left in the initial-state slot.
    #[must_use]
    pub fn residual(&self) -> f64 {
        self.rh.initial().sum() + self.rc.initial().sum()
    }
}

/// Relevance of one class score over the input embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct Relevance {
    /// Relevance through the left direction, `T × e`.
    pub left: Array2<f64>,
    /// Relevance through the right direction, `T × e`, in forward time order.
    pub right: Array2<f64>,
    /// Relevance absorbed by the initial states of both directions.
    pub residual: f64,
    /// The class score that was explained.
    pub target_score: f64,
    tensors: [DirectionRelevance; 2],
}

impl Relevance {
    /// Relevance through both directions, `T × e`.
    #[must_use]
    pub fn combined(&self) -> Array2<f64> {
        &self.left + &self.right
    }

    /// Sum of all input relevance.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.left.sum() + self.right.sum()
    }

    /// Tensors of one direction.
    #[must_use]
    pub fn direction(&self, direction: Direction) -> &DirectionRelevance {
        match direction {
            Direction::Left => &self.tensors[0],
            Direction::Right => &self.tensors[1],
        }
    }
}

/// Rerun the forward pass on `indices` and propagate the relevance of the
/// score of `class` at `word_position` (1-based) back to the inputs.
///
/// # Errors
///
/// [`lrp_core::LrpError::InvalidParameter`] for an invalid `config`, and
/// [`lrp_core::LrpError::IndexOutOfRange`] for a vocabulary index, word
/// position or class outside its range.
pub fn run_relevance(
    weights: &WeightBundle,
    indices: &[usize],
    word_position: usize,
    class: usize,
    config: &LrpConfig,
) -> Result<Relevance> {
    let rule = RelevanceRule::from_config(config)?;
    let encoded = encode(weights, indices, None)?;
    let cache = run_forward(weights, &encoded)?;
    propagate_relevance(weights, &encoded, &cache, word_position, class, &rule)
}

/// Propagate relevance through an existing forward pass of `encoded`.
pub fn propagate_relevance(
    weights: &WeightBundle,
    encoded: &EncodedInput,
    cache: &ActivationCache,
    word_position: usize,
    class: usize,
    rule: &RelevanceRule,
) -> Result<Relevance> {
    let window = SeedWindow::new(word_position, encoded.seq_len())?;
    let mask = one_hot(class, weights.shape().n_classes())?;
    tracing::debug!(
        seq_len = encoded.seq_len(),
        word_position,
        class,
        eps = rule.eps(),
        bias_factor = rule.bias_factor(),
        "propagating relevance"
    );

    let score = cache.score(window.score_step());
    let rout = &score * &mask;
    let seed_input = |direction: Direction| {
        cache
            .direction(direction)
            .state
            .h
            .row(window.score_step())
    };

    let [left, right] = Direction::BOTH.map(|direction| {
        let w = weights.direction(direction);
        let d = w.whh.ncols();
        let seed = rule.decompose(
            seed_input(direction),
            w.why.t(),
            Array1::zeros(mask.len()).view(),
            score,
            rout.view(),
            2 * d,
        )?;
        propagate_direction(
            w,
            cache.direction(direction),
            encoded,
            direction,
            &window,
            &seed,
            rule,
        )
    });
    let (left, right) = (left?, right?);

    let residual = left.residual() + right.residual();
    if !residual.is_finite() {
        tracing::warn!(residual, word_position, class, "non-finite relevance residual");
    }

    Ok(Relevance {
        left: left.rx.clone(),
        right: right.rx.slice(s![..;-1, ..]).to_owned(),
        residual,
        target_score: score[class],
        tensors: [left, right],
    })
}

fn propagate_direction(
    w: &DirectionWeights,
    cache: &DirectionCache,
    encoded: &EncodedInput,
    direction: Direction,
    window: &SeedWindow,
    seed: &Array1<f64>,
    rule: &RelevanceRule,
) -> Result<DirectionRelevance> {
    let t_len = encoded.seq_len();
    let e = encoded.embed_dim();
    let d = w.whh.ncols();
    let x = encoded.inputs(direction);

    let identity = Array2::<f64>::eye(d);
    let no_bias = Array1::<f64>::zeros(d);
    let wxh_g = w.wxh_gate(Gate::Candidate);
    let whh_g = w.whh_gate(Gate::Candidate);
    let bhh_g = w.bhh_gate(Gate::Candidate);

    let mut rh = StateBuffer::zeros(t_len, d);
    let mut rc = StateBuffer::zeros(t_len, d);
    let mut rg = Array2::zeros((t_len, d));
    let mut rx = Array2::zeros((t_len, e));
    rh.row_mut(window.seed_slot(direction)).assign(seed);

    for t in window.steps(direction) {
        let prev = rc.prev_slot(t);
        let rc_t = &rc.row(t) + &rh.row(t);
        rc.row_mut(t).assign(&rc_t);

        let c_t = cache.state.c.row(t);
        let forget_part = &cache.gate(t, Gate::Forget) * &cache.state.c.prev(t);
        let input_part = &cache.gate(t, Gate::Input) * &cache.gate(t, Gate::Candidate);
        let rc_prev = rule.decompose(
            forget_part.view(),
            identity.view(),
            no_bias.view(),
            c_t,
            rc_t.view(),
            2 * d,
        )?;
        let rg_t = rule.decompose(
            input_part.view(),
            identity.view(),
            no_bias.view(),
            c_t,
            rc_t.view(),
            2 * d,
        )?;
        rc.row_mut(prev).assign(&rc_prev);

        let g_pre = cache.gate_pre(t, Gate::Candidate);
        let rx_t = rule.decompose(x.row(t), wxh_g.t(), bhh_g, g_pre, rg_t.view(), d + e)?;
        let rh_prev = rule.decompose(
            cache.state.h.prev(t),
            whh_g.t(),
            bhh_g,
            g_pre,
            rg_t.view(),
            d + e,
        )?;
        rx.row_mut(t).assign(&rx_t);
        rh.row_mut(prev).assign(&rh_prev);
        rg.row_mut(t).assign(&rg_t);
    }

    Ok(DirectionRelevance { rx, rh, rc, rg })
}
