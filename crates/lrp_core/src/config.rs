//! Relevance propagation configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LrpError, Result};

/// Parameters of the epsilon-stabilized decomposition rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LrpConfig {
    /// Stabilizer added to every denominator, signed like the output.
    pub eps: f64,
    /// 1.0 redistributes bias and stabilizer mass onto the inputs, 0.0 drops it.
    pub bias_factor: f64,
}

impl Default for LrpConfig {
    fn default() -> Self {
        Self {
            eps: 0.001,
            bias_factor: 1.0,
        }
    }
}

impl LrpConfig {
    /// Create a config with explicit values.
    pub fn new(eps: f64, bias_factor: f64) -> Self {
        Self { eps, bias_factor }
    }

    /// Replace the stabilizer.
    #[must_use]
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Replace the bias factor.
    #[must_use]
    pub fn with_bias_factor(mut self, bias_factor: f64) -> Self {
        self.bias_factor = bias_factor;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.eps > 0.0 && self.eps.is_finite()) {
            return Err(LrpError::InvalidParameter(format!(
                "eps must be a finite value > 0, got {}",
                self.eps
            )));
        }
        if self.bias_factor != 0.0 && self.bias_factor != 1.0 {
            return Err(LrpError::InvalidParameter(format!(
                "bias_factor must be 0.0 or 1.0, got {}",
                self.bias_factor
            )));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LrpError::Serialization(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| LrpError::Serialization(e.to_string()))
    }
}
