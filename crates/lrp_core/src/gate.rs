//! Gate layout, directions and activation functions.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// One of the four gate blocks stacked along the `4d` axis.
///
/// Blocks are contiguous and ordered input, candidate, forget, output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    /// Input gate `i` (sigmoid).
    Input,
    /// Candidate gate `g` (tanh).
    Candidate,
    /// Forget gate `f` (sigmoid).
    Forget,
    /// Output gate `o` (sigmoid).
    Output,
}

impl Gate {
    /// Number of gate blocks.
    pub const COUNT: usize = 4;

    /// All gates in storage order.
    pub const ALL: [Gate; 4] = [Gate::Input, Gate::Candidate, Gate::Forget, Gate::Output];

    /// Position of this block along the stacked axis.
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Gate::Input => 0,
            Gate::Candidate => 1,
            Gate::Forget => 2,
            Gate::Output => 3,
        }
    }

    /// Row range of this gate for hidden size `d`.
    #[must_use]
    pub const fn block(self, hidden_dim: usize) -> Range<usize> {
        let start = self.offset() * hidden_dim;
        start..start + hidden_dim
    }

    /// Apply the gate's nonlinearity.
    #[inline]
    #[must_use]
    pub fn activate(self, x: f64) -> f64 {
        match self {
            Gate::Candidate => x.tanh(),
            _ => sigmoid(x),
        }
    }

    /// Derivative of the nonlinearity expressed through its output `y`.
    #[inline]
    #[must_use]
    pub fn derivative_from_output(self, y: f64) -> f64 {
        match self {
            Gate::Candidate => 1.0 - y * y,
            _ => y * (1.0 - y),
        }
    }
}

/// Traversal direction of one half of the bidirectional network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Reads the sequence in forward order (`*_Left` weights).
    Left,
    /// Reads the time-reversed sequence (`*_Right` weights).
    Right,
}

impl Direction {
    /// Both directions.
    pub const BOTH: [Direction; 2] = [Direction::Left, Direction::Right];

    /// Suffix used by weight keys.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }
}

/// Logistic sigmoid.
#[inline]
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
