//! Seed positions and support windows shared by gradients and relevance.

use std::iter::Rev;
use std::ops::Range;

use ndarray::Array1;

use lrp_core::{Direction, LrpError, Result};

/// Where a class score is seeded and which timesteps it reaches.
///
/// `word_position` is 1-based. The score read is the one at timestep
/// `word_position - 1`. The left direction is seeded at that timestep and
/// walks back to 0. The right direction is seeded at `T - word_position - 1`
/// in its own (reversed) time and walks back to 0; for `word_position == T`
/// that index is the initial-state slot, so the right seed is parked there and
/// no right-direction step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedWindow {
    word_position: usize,
    seq_len: usize,
}

impl SeedWindow {
    /// Validate `word_position` against a sequence of `seq_len` steps.
    pub fn new(word_position: usize, seq_len: usize) -> Result<Self> {
        if word_position == 0 || word_position > seq_len {
            return Err(LrpError::IndexOutOfRange {
                what: "word position",
                index: word_position,
                lower: 1,
                upper: seq_len + 1,
            });
        }
        Ok(Self {
            word_position,
            seq_len,
        })
    }

    /// 1-based word position.
    #[must_use]
    pub const fn word_position(&self) -> usize {
        self.word_position
    }

    /// Timestep whose class score is explained.
    #[must_use]
    pub const fn score_step(&self) -> usize {
        self.word_position - 1
    }

    /// Number of steps walked by `direction`.
    #[must_use]
    pub const fn span(&self, direction: Direction) -> usize {
        match direction {
            Direction::Left => self.word_position,
            Direction::Right => self.seq_len - self.word_position,
        }
    }

    /// Buffer row receiving the seed of `direction`.
    ///
    /// Returns the initial-state slot (`T`) when the right direction has an
    /// empty window.
    #[must_use]
    pub const fn seed_slot(&self, direction: Direction) -> usize {
        match self.span(direction) {
            0 => self.seq_len,
            span => span - 1,
        }
    }

    /// Timesteps visited by `direction`, latest first.
    pub fn steps(&self, direction: Direction) -> Rev<Range<usize>> {
        (0..self.span(direction)).rev()
    }
}

/// One-hot vector selecting `class` out of `n_classes`.
pub fn one_hot(class: usize, n_classes: usize) -> Result<Array1<f64>> {
    LrpError::check_index("class", class, n_classes)?;
    let mut mask = Array1::zeros(n_classes);
    mask[class] = 1.0;
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_middle_position() {
        let window = SeedWindow::new(2, 5).unwrap();
        assert_eq!(window.score_step(), 1);
        assert_eq!(window.seed_slot(Direction::Left), 1);
        assert_eq!(window.seed_slot(Direction::Right), 2);
        assert_eq!(window.steps(Direction::Left).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(
            window.steps(Direction::Right).collect::<Vec<_>>(),
            vec![2, 1, 0]
        );
    }

    #[test]
    fn test_window_last_position_parks_right_seed() {
        let window = SeedWindow::new(4, 4).unwrap();
        assert_eq!(window.seed_slot(Direction::Left), 3);
        assert_eq!(window.seed_slot(Direction::Right), 4);
        assert_eq!(window.steps(Direction::Right).count(), 0);
    }

    #[test]
    fn test_window_bounds() {
        assert!(SeedWindow::new(0, 3).is_err());
        assert!(SeedWindow::new(4, 3).is_err());
        assert!(SeedWindow::new(1, 1).is_ok());
    }

    #[test]
    fn test_one_hot() {
        assert_eq!(one_hot(1, 3).unwrap().to_vec(), vec![0.0, 1.0, 0.0]);
        assert!(one_hot(3, 3).is_err());
    }
}
