//! Attribution maps over input sequences.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use lrp_core::{LrpError, Result};

/// Method used to produce an attribution map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributionMethod {
    /// Layer-wise relevance propagation with the epsilon rule.
    Relevance,
    /// Raw gradient of the class score.
    Gradient,
    /// Input × Gradient.
    InputGradient,
}

/// Attribution over the embedding dimensions of every position, `T × e`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionMap {
    /// The attribution values.
    pub values: Array2<f64>,
    /// The method used.
    pub method: AttributionMethod,
    /// Class whose score is explained.
    pub target_class: Option<usize>,
    /// 1-based position whose score is explained.
    pub word_position: Option<usize>,
}

impl AttributionMap {
    /// Create a new attribution map.
    pub fn new(values: Array2<f64>, method: AttributionMethod) -> Self {
        Self {
            values,
            method,
            target_class: None,
            word_position: None,
        }
    }

    /// Set the target class.
    pub fn with_target_class(mut self, class: usize) -> Self {
        self.target_class = Some(class);
        self
    }

    /// Set the explained word position.
    pub fn with_word_position(mut self, word_position: usize) -> Self {
        self.word_position = Some(word_position);
        self
    }

    /// Sequence length.
    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.values.nrows()
    }

    /// One score per position, summed over the embedding dimensions.
    #[must_use]
    pub fn per_position(&self) -> Array1<f64> {
        self.values.sum_axis(Axis(1))
    }

    /// Sum of all attribution.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.sum()
    }

    /// Normalize the attribution values to [0, 1].
    pub fn normalize(&self) -> Self {
        let min_val = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max_val = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max_val - min_val;

        // Constant maps are left untouched.
        let values = if range > 1e-12 {
            self.values.mapv(|v| (v - min_val) / range)
        } else {
            self.values.clone()
        };

        Self {
            values,
            method: self.method,
            target_class: self.target_class,
            word_position: self.word_position,
        }
    }

    /// The `k` positions with the highest per-position score, best first.
    /// Ties keep the earlier position first.
    #[must_use]
    pub fn top_positions(&self, k: usize) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> =
            self.per_position().into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

/// Compute Input × Gradient attribution.
///
/// # Arguments
///
/// * `input` - Embedded input, `T × e`
/// * `gradients` - Gradient of the class score with respect to `input`
///
/// # Errors
///
/// [`LrpError::ShapeMismatch`] if the two arrays differ in shape.
pub fn input_gradient(input: &Array2<f64>, gradients: &Array2<f64>) -> Result<AttributionMap> {
    if input.dim() != gradients.dim() {
        return Err(LrpError::ShapeMismatch(format!(
            "input is {:?}, gradients are {:?}",
            input.dim(),
            gradients.dim()
        )));
    }
    Ok(AttributionMap::new(
        input * gradients,
        AttributionMethod::InputGradient,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_per_position_and_total() {
        let map = AttributionMap::new(
            array![[1.0, 2.0], [-0.5, 0.5], [3.0, -1.0]],
            AttributionMethod::Relevance,
        );
        assert_eq!(map.per_position().to_vec(), vec![3.0, 0.0, 2.0]);
        assert!((map.total() - 5.0).abs() < 1e-12);
        assert_eq!(map.seq_len(), 3);
    }

    #[test]
    fn test_normalize() {
        let map = AttributionMap::new(array![[-1.0, 1.0], [0.0, 3.0]], AttributionMethod::Gradient)
            .with_target_class(2);
        let normalized = map.normalize();
        assert_eq!(normalized.values, array![[0.0, 0.5], [0.25, 1.0]]);
        assert_eq!(normalized.target_class, Some(2));

        let flat = AttributionMap::new(array![[2.0, 2.0]], AttributionMethod::Gradient);
        assert_eq!(flat.normalize().values, flat.values);
    }

    #[test]
    fn test_top_positions() {
        let map = AttributionMap::new(
            array![[1.0, 0.0], [4.0, 0.0], [-2.0, 0.0], [4.0, 0.0]],
            AttributionMethod::Relevance,
        );
        let top = map.top_positions(3);
        assert_eq!(top, vec![(1, 4.0), (3, 4.0), (0, 1.0)]);
        assert_eq!(map.top_positions(10).len(), 4);
    }

    #[test]
    fn test_input_gradient() {
        let x = array![[1.0, -2.0], [0.5, 0.0]];
        let grad = array![[3.0, 1.0], [-2.0, 7.0]];
        let map = input_gradient(&x, &grad).unwrap();
        assert_eq!(map.values, array![[3.0, -2.0], [-1.0, 0.0]]);
        assert_eq!(map.method, AttributionMethod::InputGradient);

        assert!(input_gradient(&x, &array![[1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_method_serialization() {
        let json = serde_json::to_string(&AttributionMethod::InputGradient).unwrap();
        assert_eq!(json, "\"InputGradient\"");
        let method: AttributionMethod = serde_json::from_str("\"Relevance\"").unwrap();
        assert_eq!(method, AttributionMethod::Relevance);
    }
}
