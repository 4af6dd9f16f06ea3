//! Bounded result tables: voltage violations and most-loaded branches.

use serde::{Deserialize, Serialize};

use super::sanitize::finite;
use crate::grid::{Line, Transformer};

/// Maximum rows in the voltage-violation table.
pub const MAX_VIOLATION_ROWS: usize = 200;
/// Rows in each most-loaded ranking.
pub const TOP_N: usize = 10;

/// One bus outside the voltage band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageViolation {
    /// Positional bus index.
    pub bus: usize,
    pub vm_pu: Option<f64>,
    pub va_degree: Option<f64>,
}

/// One entry of the most-loaded lines ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineLoading {
    /// Positional line index.
    pub line: usize,
    pub loading_percent: Option<f64>,
    pub from_bus: usize,
    pub to_bus: usize,
}

/// One entry of the most-loaded transformers ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafoLoading {
    /// Positional transformer index.
    pub trafo: usize,
    pub loading_percent: Option<f64>,
    pub hv_bus: usize,
    pub lv_bus: usize,
}

/// Indices of every bus with `vm < vmin` or `vm > vmax`, ascending.
///
/// NaN magnitudes compare false on both sides and are never violations.
pub fn violating_buses(vm_pu: &[f64], vmin: f64, vmax: f64) -> Vec<usize> {
    vm_pu
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v < vmin || v > vmax)
        .map(|(i, _)| i)
        .collect()
}

/// Violation rows for the first [`MAX_VIOLATION_ROWS`] violating buses.
pub fn violation_rows(violating: &[usize], vm_pu: &[f64], va_degree: &[f64]) -> Vec<VoltageViolation> {
    violating
        .iter()
        .take(MAX_VIOLATION_ROWS)
        .map(|&bus| VoltageViolation {
            bus,
            vm_pu: finite(vm_pu[bus]),
            va_degree: finite(va_degree[bus]),
        })
        .collect()
}

/// Indices of the `n` largest values, largest first.
///
/// NaN ranks as negative infinity so it sinks below every number. Ties keep
/// ascending index order.
pub fn rank_descending(values: &[f64], n: usize) -> Vec<usize> {
    let key = |i: usize| {
        let v = values[i];
        if v.is_nan() { f64::NEG_INFINITY } else { v }
    };
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| key(b).total_cmp(&key(a)));
    order.truncate(n);
    order
}

/// Most-loaded lines, at most [`TOP_N`].
pub fn top_lines(loading: &[f64], lines: &[Line]) -> Vec<LineLoading> {
    rank_descending(loading, TOP_N)
        .into_iter()
        .map(|j| LineLoading {
            line: j,
            loading_percent: finite(loading[j]),
            from_bus: lines[j].from_bus,
            to_bus: lines[j].to_bus,
        })
        .collect()
}

/// Most-loaded transformers, at most [`TOP_N`].
pub fn top_trafos(loading: &[f64], trafos: &[Transformer]) -> Vec<TrafoLoading> {
    rank_descending(loading, TOP_N)
        .into_iter()
        .map(|j| TrafoLoading {
            trafo: j,
            loading_percent: finite(loading[j]),
            hv_bus: trafos[j].hv_bus,
            lv_bus: trafos[j].lv_bus,
        })
        .collect()
}
