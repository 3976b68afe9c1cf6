//! Sequence encoding and recurrent state buffers.

use ndarray::{s, Array2, ArrayView1, ArrayViewMut1, Axis};

use lrp_core::{Direction, LrpError, Result};

use crate::weights::WeightBundle;

/// A `(T + 1) × width` buffer of per-timestep vectors.
///
/// Rows `0..T` belong to the real timesteps. Row `T` is the initial-state
/// slot: it is what timestep 0 reads as its "previous" row. The slot is
/// addressed explicitly through [`StateBuffer::prev_slot`], never by
/// wrapping a negative index.
#[derive(Debug, Clone, PartialEq)]
pub struct StateBuffer {
    data: Array2<f64>,
}

impl StateBuffer {
    /// All-zero buffer for a sequence of `seq_len` steps.
    #[must_use]
    pub fn zeros(seq_len: usize, width: usize) -> Self {
        Self {
            data: Array2::zeros((seq_len + 1, width)),
        }
    }

    /// Number of real timesteps `T`.
    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.data.nrows() - 1
    }

    /// Width of every row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Row index of the initial-state slot (`T`).
    #[must_use]
    pub fn initial_slot(&self) -> usize {
        self.seq_len()
    }

    /// Row read as "previous" by timestep `t`.
    #[must_use]
    pub fn prev_slot(&self, t: usize) -> usize {
        if t == 0 {
            self.initial_slot()
        } else {
            t - 1
        }
    }

    /// Row `slot`.
    pub fn row(&self, slot: usize) -> ArrayView1<'_, f64> {
        self.data.row(slot)
    }

    /// Mutable row `slot`.
    pub fn row_mut(&mut self, slot: usize) -> ArrayViewMut1<'_, f64> {
        self.data.row_mut(slot)
    }

    /// Row preceding timestep `t`.
    pub fn prev(&self, t: usize) -> ArrayView1<'_, f64> {
        self.data.row(self.prev_slot(t))
    }

    /// The initial-state slot.
    pub fn initial(&self) -> ArrayView1<'_, f64> {
        self.data.row(self.initial_slot())
    }

    /// Rows of the real timesteps only, `T × width`.
    pub fn steps(&self) -> ndarray::ArrayView2<'_, f64> {
        self.data.slice(s![..self.seq_len(), ..])
    }

    /// The whole buffer, initial-state slot included.
    #[must_use]
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }
}

/// Hidden and cell state sequences of one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentState {
    /// Hidden states `h`.
    pub h: StateBuffer,
    /// Cell states `c`.
    pub c: StateBuffer,
}

impl RecurrentState {
    /// Zeroed state, which also fixes the zero initial state.
    #[must_use]
    pub fn zeros(seq_len: usize, hidden_dim: usize) -> Self {
        Self {
            h: StateBuffer::zeros(seq_len, hidden_dim),
            c: StateBuffer::zeros(seq_len, hidden_dim),
        }
    }
}

/// Numeric input of one analysed sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedInput {
    indices: Vec<usize>,
    masked: Vec<usize>,
    x: Array2<f64>,
    x_rev: Array2<f64>,
}

impl EncodedInput {
    /// Vocabulary indices the input was built from.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Positions whose embeddings were zeroed.
    #[must_use]
    pub fn masked(&self) -> &[usize] {
        &self.masked
    }

    /// Sequence length `T`.
    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.x.nrows()
    }

    /// Embedding dimension `e`.
    #[must_use]
    pub fn embed_dim(&self) -> usize {
        self.x.ncols()
    }

    /// Forward-order embeddings, `T × e`.
    #[must_use]
    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    /// Time-reversed embeddings, `T × e`.
    #[must_use]
    pub fn x_rev(&self) -> &Array2<f64> {
        &self.x_rev
    }

    /// Input read by `direction`.
    #[must_use]
    pub fn inputs(&self, direction: Direction) -> &Array2<f64> {
        match direction {
            Direction::Left => &self.x,
            Direction::Right => &self.x_rev,
        }
    }

    /// Zeroed hidden/cell buffers for one direction.
    #[must_use]
    pub fn initial_state(&self, hidden_dim: usize) -> RecurrentState {
        RecurrentState::zeros(self.seq_len(), hidden_dim)
    }
}

/// Look up the embeddings of `indices`, zeroing the rows listed in `mask`.
///
/// # Errors
///
/// - [`LrpError::InvalidParameter`] for an empty sequence
/// - [`LrpError::IndexOutOfRange`] for an index outside the vocabulary or a
///   mask position outside the sequence
pub fn encode(
    weights: &WeightBundle,
    indices: &[usize],
    mask: Option<&[usize]>,
) -> Result<EncodedInput> {
    if indices.is_empty() {
        return Err(LrpError::InvalidParameter(
            "input sequence must contain at least one index".to_string(),
        ));
    }
    let embeddings = weights.embeddings();
    let vocab = embeddings.nrows();
    for &index in indices {
        LrpError::check_index("vocabulary", index, vocab)?;
    }

    let mut x = embeddings.select(Axis(0), indices);
    let mut masked = mask.map(<[usize]>::to_vec).unwrap_or_default();
    for &position in &masked {
        LrpError::check_index("mask position", position, indices.len())?;
        x.row_mut(position).fill(0.0);
    }
    masked.sort_unstable();
    masked.dedup();

    let x_rev = x.slice(s![..;-1, ..]).to_owned();

    Ok(EncodedInput {
        indices: indices.to_vec(),
        masked,
        x,
        x_rev,
    })
}
