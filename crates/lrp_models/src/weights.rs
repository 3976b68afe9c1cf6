//! Pretrained bidirectional LSTM weights.
//!
//! A [`WeightBundle`] is validated once at construction and never mutated
//! afterwards, so it can be shared between sessions behind an `Arc`.

use std::collections::HashMap;

use ndarray::{
    s, Array, Array1, Array2, ArrayD, ArrayView1, ArrayView2, Dimension, Ix1, Ix2, ShapeBuilder,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use lrp_core::{Direction, Gate, LrpError, LstmShape, Result};

/// Key of the embedding matrix in a named weight mapping.
pub const EMBEDDINGS_KEY: &str = "embeddings";

/// Weights of one recurrent direction plus its share of the output projection.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionWeights {
    /// Input-to-hidden gate weights, `4d × e`.
    pub wxh: Array2<f64>,
    /// Hidden-to-hidden gate weights, `4d × d`.
    pub whh: Array2<f64>,
    /// Gate bias, `4d`.
    pub bhh: Array1<f64>,
    /// Output projection, `C × d`.
    pub why: Array2<f64>,
}

impl DirectionWeights {
    /// Rows of `Wxh` belonging to `gate`.
    pub fn wxh_gate(&self, gate: Gate) -> ArrayView2<'_, f64> {
        let d = self.whh.ncols();
        self.wxh.slice(s![gate.block(d), ..])
    }

    /// Rows of `Whh` belonging to `gate`.
    pub fn whh_gate(&self, gate: Gate) -> ArrayView2<'_, f64> {
        let d = self.whh.ncols();
        self.whh.slice(s![gate.block(d), ..])
    }

    /// Entries of `bhh` belonging to `gate`.
    pub fn bhh_gate(&self, gate: Gate) -> ArrayView1<'_, f64> {
        let d = self.whh.ncols();
        self.bhh.slice(s![gate.block(d)])
    }

    fn check(&self, direction: Direction, shape: &LstmShape) -> Result<()> {
        let name = direction.suffix();
        let (gd, e, d, c) = (
            shape.gate_dim(),
            shape.embed_dim(),
            shape.hidden_dim(),
            shape.n_classes(),
        );
        expect_dims(&format!("Wxh_{name}"), self.wxh.dim(), (gd, e))?;
        expect_dims(&format!("Whh_{name}"), self.whh.dim(), (gd, d))?;
        expect_dims(&format!("Why_{name}"), self.why.dim(), (c, d))?;
        if self.bhh.len() != gd {
            return Err(LrpError::ShapeMismatch(format!(
                "bhh_{name} has length {}, expected {gd}",
                self.bhh.len()
            )));
        }
        Ok(())
    }
}

fn expect_dims(name: &str, got: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if got != expected {
        return Err(LrpError::ShapeMismatch(format!(
            "{name} has shape {got:?}, expected {expected:?}"
        )));
    }
    Ok(())
}

/// Embeddings and both directions' weights of a bidirectional LSTM classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightBundle {
    embeddings: Array2<f64>,
    left: DirectionWeights,
    right: DirectionWeights,
    shape: LstmShape,
}

impl WeightBundle {
    /// Assemble a bundle, checking that `e`, `d` and `C` agree everywhere.
    ///
    /// # Errors
    ///
    /// Returns [`LrpError::ShapeMismatch`] if any matrix disagrees with the
    /// dimensions implied by the embeddings and the left direction.
    pub fn new(
        embeddings: Array2<f64>,
        left: DirectionWeights,
        right: DirectionWeights,
    ) -> Result<Self> {
        let gate_rows = left.wxh.nrows();
        if gate_rows == 0 || gate_rows % Gate::COUNT != 0 {
            return Err(LrpError::ShapeMismatch(format!(
                "Wxh_Left has {gate_rows} rows, expected a positive multiple of {}",
                Gate::COUNT
            )));
        }
        let shape = LstmShape::new(
            embeddings.nrows(),
            embeddings.ncols(),
            gate_rows / Gate::COUNT,
            left.why.nrows(),
        );
        shape.validate()?;
        left.check(Direction::Left, &shape)?;
        right.check(Direction::Right, &shape)?;

        Ok(Self {
            embeddings,
            left,
            right,
            shape,
        })
    }

    /// Build a bundle from a name → array mapping.
    ///
    /// Expects the keys `embeddings`, `Wxh_Left`, `Whh_Left`, `bhh_Left`,
    /// `Why_Left` and their `_Right` counterparts.
    pub fn from_named(mut named: HashMap<String, ArrayD<f64>>) -> Result<Self> {
        let embeddings = take_matrix(&mut named, EMBEDDINGS_KEY)?;
        let left = take_direction(&mut named, Direction::Left)?;
        let right = take_direction(&mut named, Direction::Right)?;
        if !named.is_empty() {
            let mut extra: Vec<_> = named.into_keys().collect();
            extra.sort();
            tracing::warn!("ignoring unknown weight keys: {}", extra.join(", "));
        }
        Self::new(embeddings, left, right)
    }

    /// Deterministic random weights drawn uniformly from `[-scale, scale)`.
    pub fn random(shape: LstmShape, seed: u64, scale: f64) -> Result<Self> {
        shape.validate()?;
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(LrpError::InvalidParameter(format!(
                "scale must be a finite value > 0, got {scale}"
            )));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (e, d, c) = (shape.embed_dim(), shape.hidden_dim(), shape.n_classes());
        let embeddings = uniform(&mut rng, (shape.vocab_size(), e), scale);
        let mut direction = || DirectionWeights {
            wxh: uniform(&mut rng, (4 * d, e), scale),
            whh: uniform(&mut rng, (4 * d, d), scale),
            bhh: uniform(&mut rng, 4 * d, scale),
            why: uniform(&mut rng, (c, d), scale),
        };
        let left = direction();
        let right = direction();
        Self::new(embeddings, left, right)
    }

    /// Shared dimensions.
    #[must_use]
    pub const fn shape(&self) -> LstmShape {
        self.shape
    }

    /// Embedding matrix `E`, `V × e`.
    #[must_use]
    pub fn embeddings(&self) -> &Array2<f64> {
        &self.embeddings
    }

    /// Weights of one direction.
    #[must_use]
    pub fn direction(&self, direction: Direction) -> &DirectionWeights {
        match direction {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }
}

fn uniform<Sh, D>(rng: &mut ChaCha8Rng, shape: Sh, scale: f64) -> Array<f64, D>
where
    Sh: ShapeBuilder<Dim = D>,
    D: Dimension,
{
    Array::from_shape_simple_fn(shape, || rng.gen_range(-scale..scale))
}

fn take_array(named: &mut HashMap<String, ArrayD<f64>>, key: &str) -> Result<ArrayD<f64>> {
    named
        .remove(key)
        .ok_or_else(|| LrpError::ShapeMismatch(format!("missing weight '{key}'")))
}

fn take_matrix(named: &mut HashMap<String, ArrayD<f64>>, key: &str) -> Result<Array2<f64>> {
    let array = take_array(named, key)?;
    let ndim = array.ndim();
    array
        .into_dimensionality::<Ix2>()
        .map_err(|_| LrpError::ShapeMismatch(format!("'{key}' must be 2-dimensional, got {ndim}")))
}

fn take_vector(named: &mut HashMap<String, ArrayD<f64>>, key: &str) -> Result<Array1<f64>> {
    let array = take_array(named, key)?;
    let ndim = array.ndim();
    array
        .into_dimensionality::<Ix1>()
        .map_err(|_| LrpError::ShapeMismatch(format!("'{key}' must be 1-dimensional, got {ndim}")))
}

fn take_direction(
    named: &mut HashMap<String, ArrayD<f64>>,
    direction: Direction,
) -> Result<DirectionWeights> {
    let key = |name: &str| format!("{name}_{}", direction.suffix());
    Ok(DirectionWeights {
        wxh: take_matrix(named, &key("Wxh"))?,
        whh: take_matrix(named, &key("Whh"))?,
        bhh: take_vector(named, &key("bhh"))?,
        why: take_matrix(named, &key("Why"))?,
    })
}
