//! Epsilon-stabilized relevance decomposition of a linear map.
//!
//! The same rule serves genuine affine layers, the output projection and the
//! element-wise products of the cell update (decomposed against an identity
//! weight matrix).

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use lrp_core::{LrpConfig, LrpError, Result};

/// Sign used to stabilize a denominator: `+1` for positive values, `-1`
/// otherwise.
///
/// Zero maps to `-1`. This boundary behaviour is kept as is so results match
/// existing relevance maps; a rule treating zero separately would change the
/// scores of exactly-zero outputs.
#[inline]
#[must_use]
pub fn stabilizer_sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// `ΣRout − ΣRin`, the relevance lost (or created) by one decomposition.
#[must_use]
pub fn conservation_residual(rout: ArrayView1<'_, f64>, rin: ArrayView1<'_, f64>) -> f64 {
    rout.sum() - rin.sum()
}

/// The epsilon rule with fixed stabilizer and bias handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceRule {
    eps: f64,
    bias_factor: f64,
}

impl RelevanceRule {
    /// Create a rule.
    ///
    /// # Errors
    ///
    /// [`LrpError::InvalidParameter`] if `eps <= 0` or `bias_factor` is not
    /// 0.0 or 1.0.
    pub fn new(eps: f64, bias_factor: f64) -> Result<Self> {
        Self::from_config(&LrpConfig::new(eps, bias_factor))
    }

    /// Create a rule from a validated configuration.
    pub fn from_config(config: &LrpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            eps: config.eps,
            bias_factor: config.bias_factor,
        })
    }

    /// Stabilizer.
    #[must_use]
    pub const fn eps(&self) -> f64 {
        self.eps
    }

    /// Bias redistribution factor.
    #[must_use]
    pub const fn bias_factor(&self) -> f64 {
        self.bias_factor
    }

    /// Redistribute `rout` onto the inputs of `hout ≈ wᵀ·hin + b`.
    ///
    /// * `hin` - realized input, length `D`
    /// * `w` - weights, `D × M`
    /// * `b` - bias, length `M`
    /// * `hout` - realized output, length `M`; may include contributions from
    ///   other branches, so it is not recomputed from `w` and `hin`
    /// * `rout` - relevance of the outputs, length `M`
    /// * `bias_nb_units` - number of input units sharing the bias and
    ///   stabilizer mass
    ///
    /// Relevance is conserved up to the stabilizer when `bias_factor` is 1.0
    /// and `bias_nb_units` equals the number of units feeding `hout`.
    pub fn decompose(
        &self,
        hin: ArrayView1<'_, f64>,
        w: ArrayView2<'_, f64>,
        b: ArrayView1<'_, f64>,
        hout: ArrayView1<'_, f64>,
        rout: ArrayView1<'_, f64>,
        bias_nb_units: usize,
    ) -> Result<Array1<f64>> {
        let (d_in, m_out) = w.dim();
        if hin.len() != d_in {
            return Err(LrpError::ShapeMismatch(format!(
                "hin has length {}, weights expect {d_in} inputs",
                hin.len()
            )));
        }
        for (name, len) in [("b", b.len()), ("hout", hout.len()), ("Rout", rout.len())] {
            if len != m_out {
                return Err(LrpError::ShapeMismatch(format!(
                    "{name} has length {len}, weights expect {m_out} outputs"
                )));
            }
        }
        if bias_nb_units == 0 {
            return Err(LrpError::InvalidParameter(
                "bias_nb_units must be > 0".to_string(),
            ));
        }

        let stabilizer = hout.mapv(stabilizer_sign) * self.eps;
        let denom = &hout + &stabilizer;
        let bias_share = (&b + &stabilizer) * (self.bias_factor / bias_nb_units as f64);

        let messages = Array2::from_shape_fn((d_in, m_out), |(i, m)| {
            let numer = w[[i, m]] * hin[i] + bias_share[m];
            (numer / denom[m]) * rout[m]
        });
        let rin = messages.sum_axis(Axis(1));

        tracing::trace!(
            residual = conservation_residual(rout, rin.view()),
            "local relevance conservation"
        );
        Ok(rin)
    }
}

impl Default for RelevanceRule {
    fn default() -> Self {
        let config = LrpConfig::default();
        Self {
            eps: config.eps,
            bias_factor: config.bias_factor,
        }
    }
}
