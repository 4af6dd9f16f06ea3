//! What-if scenarios: uniform scaling of load and generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::model::GridModel;

/// Scale factor used when a request omits a field or sends something unusable.
pub const DEFAULT_SCALE: f64 = 1.0;

/// Rejected scale factor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    #[error("{field} must be a finite number > 0, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Uniform multipliers applied to a freshly loaded model before solving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioScale {
    /// Multiplier for every load's `p_mw` and `q_mvar`.
    pub load_scale: f64,
    /// Multiplier for every generator's `p_mw`.
    pub gen_scale: f64,
}

impl Default for ScenarioScale {
    fn default() -> Self {
        Self {
            load_scale: DEFAULT_SCALE,
            gen_scale: DEFAULT_SCALE,
        }
    }
}

impl ScenarioScale {
    /// Creates a validated scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::OutOfRange`] if either factor is zero,
    /// negative, or not finite.
    pub fn new(load_scale: f64, gen_scale: f64) -> Result<Self, ScenarioError> {
        check("load_scale", load_scale)?;
        check("gen_scale", gen_scale)?;
        Ok(Self {
            load_scale,
            gen_scale,
        })
    }

    /// Builds a scenario from a loosely typed request body.
    ///
    /// A field that is absent, `null`, or not interpretable as a number falls
    /// back to [`DEFAULT_SCALE`]. Numeric strings such as `"1.2"` are
    /// accepted. A body that is not a JSON object yields the default
    /// scenario. Numbers that do come through are then range-checked by
    /// [`ScenarioScale::new`].
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::OutOfRange`] for zero, negative or
    /// non-finite factors.
    pub fn from_body(body: &Value) -> Result<Self, ScenarioError> {
        let field = |name: &str| body.get(name).and_then(coerce).unwrap_or(DEFAULT_SCALE);
        Self::new(field("load_scale"), field("gen_scale"))
    }

    /// Scales the model's loads and generators in place.
    ///
    /// Empty tables are left alone. The model is consumed by the scenario
    /// run that follows and must not be reused for another one.
    pub fn apply(&self, model: &mut GridModel) {
        for load in &mut model.load {
            load.p_mw *= self.load_scale;
            load.q_mvar *= self.load_scale;
        }
        for generator in &mut model.generators {
            generator.p_mw *= self.gen_scale;
        }
    }
}

fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check(field: &'static str, value: f64) -> Result<(), ScenarioError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ScenarioError::OutOfRange { field, value })
    }
}
