//! Reshapes raw solver output into the JSON-safe API payload.
//!
//! [`summarize`] is pure: it reads one [`SolveResult`] together with the model
//! it was computed from and never touches the solver or the cache. Numeric
//! anomalies in the solver output (NaN, ±inf, empty tables) degrade to nulls,
//! zeros and empty lists; structural mismatches are reported as
//! [`SummaryError`].

pub mod kpi;
pub mod sanitize;
pub mod tables;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{GridModel, ScenarioScale};
use crate::solver::SolveResult;

pub use kpi::Kpis;
pub use tables::{LineLoading, TrafoLoading, VoltageViolation};

/// Message carried by every non-converged summary.
pub const NON_CONVERGENCE_MESSAGE: &str = "Power flow did not converge.";

/// Operating limits applied to one summary and echoed back to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Lower edge of the voltage band (pu).
    pub vmin_pu: f64,
    /// Upper edge of the voltage band (pu).
    pub vmax_pu: f64,
    /// Loading above which a branch counts as thermally stressed (%).
    pub thermal_warn_pct: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            vmin_pu: 0.94,
            vmax_pu: 1.06,
            thermal_warn_pct: 80.0,
        }
    }
}

/// Full per-element series for plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub bus_voltage_pu: Vec<Option<f64>>,
    pub line_loading_percent: Vec<Option<f64>>,
    pub trafo_loading_percent: Vec<Option<f64>>,
}

/// Bounded tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    pub voltage_violations: Vec<VoltageViolation>,
    pub top_lines: Vec<LineLoading>,
    pub top_trafos: Vec<TrafoLoading>,
}

/// Summary of a converged solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    converged: bool,
    pub case_path: String,
    /// Scale factors, present only on scenario runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioScale>,
    pub kpis: Kpis,
    pub limits: Limits,
    pub series: Series,
    pub tables: Tables,
}

/// Summary of a solve that did not converge. Carries nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    converged: bool,
    pub error: String,
}

impl Divergence {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            converged: false,
            error: error.into(),
        }
    }
}

impl Default for Divergence {
    fn default() -> Self {
        Self::new(NON_CONVERGENCE_MESSAGE)
    }
}

/// The API response payload. Converged and non-converged shapes are disjoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Summary {
    Converged(Box<Report>),
    Diverged(Divergence),
}

impl Summary {
    pub fn converged(&self) -> bool {
        matches!(self, Self::Converged(_))
    }

    /// The converged report, if any.
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Converged(report) => Some(&**report),
            Self::Diverged(_) => None,
        }
    }
}

/// Solver output that does not line up with the model it was computed from.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SummaryError {
    #[error("malformed solve result: {table} has {actual} entries, model has {expected}")]
    Malformed {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
}

fn check_len(table: &'static str, expected: usize, actual: usize) -> Result<(), SummaryError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SummaryError::Malformed {
            table,
            expected,
            actual,
        })
    }
}

/// Loading series for one branch table.
///
/// Empty when the model has no such elements or the solver left the column
/// out; an error when the column is present but misaligned.
fn branch_loading<'a>(
    table: &'static str,
    n_elements: usize,
    column: Option<&'a [f64]>,
) -> Result<&'a [f64], SummaryError> {
    match column {
        Some(values) if n_elements > 0 => {
            check_len(table, n_elements, values.len())?;
            Ok(values)
        }
        _ => Ok(&[]),
    }
}

/// Turns one solve into one [`Summary`].
///
/// # Arguments
///
/// * `model` - The model that was solved (after scenario scaling)
/// * `result` - Solver output for `model`
/// * `limits` - Voltage band and thermal threshold to evaluate against
/// * `case_path` - Case reference echoed in the report
/// * `scenario` - Scale factors for scenario runs, `None` for the base case
///
/// # Errors
///
/// Returns [`SummaryError::Malformed`] if a result array's length differs
/// from the element count of the model table it describes.
pub fn summarize(
    model: &GridModel,
    result: &SolveResult,
    limits: &Limits,
    case_path: &str,
    scenario: Option<ScenarioScale>,
) -> Result<Summary, SummaryError> {
    if !result.converged {
        return Ok(Summary::Diverged(Divergence::default()));
    }

    let n_bus = model.bus.len();
    check_len("vm_pu", n_bus, result.vm_pu.len())?;
    check_len("va_degree", n_bus, result.va_degree.len())?;
    let vm = result.vm_pu.as_slice();
    let va = result.va_degree.as_slice();

    let violating = tables::violating_buses(vm, limits.vmin_pu, limits.vmax_pu);

    let line_loading = branch_loading(
        "line_loading_percent",
        model.line.len(),
        result.line_loading_percent.as_deref(),
    )?;
    let trafo_loading = branch_loading(
        "trafo_loading_percent",
        model.trafo.len(),
        result.trafo_loading_percent.as_deref(),
    )?;

    let series = Series {
        bus_voltage_pu: sanitize::finite_series(vm),
        line_loading_percent: sanitize::finite_series(line_loading),
        trafo_loading_percent: sanitize::finite_series(trafo_loading),
    };

    let kpis = Kpis::compute(
        model,
        vm,
        violating.len(),
        &series.line_loading_percent,
        &series.trafo_loading_percent,
        limits.thermal_warn_pct,
    );

    let tables = Tables {
        voltage_violations: tables::violation_rows(&violating, vm, va),
        top_lines: tables::top_lines(line_loading, &model.line),
        top_trafos: tables::top_trafos(trafo_loading, &model.trafo),
    };

    Ok(Summary::Converged(Box::new(Report {
        converged: true,
        case_path: case_path.to_string(),
        scenario,
        kpis,
        limits: *limits,
        series,
        tables,
    })))
}
