//! Aggregate KPIs over one solved case.

use serde::{Deserialize, Serialize};

use super::sanitize::finite;
use crate::grid::GridModel;

/// Headline figures for one solved case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub n_bus: usize,
    pub n_line: usize,
    pub n_trafo: usize,
    pub n_load: usize,
    pub n_gen: usize,
    /// Sum of load active power (MW), after any scenario scaling.
    pub total_load_mw: Option<f64>,
    /// Sum of generator active power (MW), after any scenario scaling.
    pub total_gen_mw: Option<f64>,
    pub v_min: Option<f64>,
    pub v_max: Option<f64>,
    pub v_mean: Option<f64>,
    /// Exact number of buses outside the voltage band.
    pub voltage_violations: usize,
    /// Lines loaded above `limits.thermal_warn_pct` (80 % by default).
    pub line_over_80pct: usize,
    /// Transformers loaded above `limits.thermal_warn_pct` (80 % by default).
    pub trafo_over_80pct: usize,
}

/// Min, max and mean of the non-NaN entries; all `None` if there are none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl VoltageStats {
    pub fn from_series(vm_pu: &[f64]) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0_f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for &v in vm_pu.iter().filter(|v| !v.is_nan()) {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        if count == 0 {
            return Self {
                min: None,
                max: None,
                mean: None,
            };
        }

        Self {
            min: finite(min),
            max: finite(max),
            mean: finite(sum / count as f64),
        }
    }
}

/// Counts sanitised loadings strictly above `threshold`; nulls never count.
pub fn count_over(series: &[Option<f64>], threshold: f64) -> usize {
    series.iter().flatten().filter(|&&x| x > threshold).count()
}

impl Kpis {
    /// Builds the KPI block.
    ///
    /// # Arguments
    ///
    /// * `model` - The solved model (already scenario-scaled)
    /// * `vm_pu` - Raw per-bus voltage magnitudes
    /// * `voltage_violations` - Untruncated violation count
    /// * `line_series` / `trafo_series` - Sanitised loading series
    /// * `thermal_warn_pct` - Loading threshold for the over-threshold counts
    pub fn compute(
        model: &GridModel,
        vm_pu: &[f64],
        voltage_violations: usize,
        line_series: &[Option<f64>],
        trafo_series: &[Option<f64>],
        thermal_warn_pct: f64,
    ) -> Self {
        let stats = VoltageStats::from_series(vm_pu);

        Self {
            n_bus: model.bus.len(),
            n_line: model.line.len(),
            n_trafo: model.trafo.len(),
            n_load: model.load.len(),
            n_gen: model.generators.len(),
            total_load_mw: finite(model.total_load_mw()),
            total_gen_mw: finite(model.total_gen_mw()),
            v_min: stats.min,
            v_max: stats.max,
            v_mean: stats.mean,
            voltage_violations,
            line_over_80pct: count_over(line_series, thermal_warn_pct),
            trafo_over_80pct: count_over(trafo_series, thermal_warn_pct),
        }
    }
}
