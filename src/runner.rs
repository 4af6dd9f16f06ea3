//! One complete load-flow run: load → (scale) → solve → summarize.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use crate::grid::{CaseLoadError, CaseLoader, ScenarioScale};
use crate::solver::{LoadFlowSolver, SolveOptions, SolverError};
use crate::summary::{Limits, Summary, SummaryError, summarize};

/// A run that failed to produce a summary.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    CaseLoad(#[from] CaseLoadError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Malformed(#[from] SummaryError),
}

/// The case every run starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSource {
    pub path: PathBuf,
    /// Nominal system frequency (Hz).
    pub f_hz: f64,
}

/// Wires the case loader and solver together.
///
/// Every call loads a fresh model, so no run can observe another run's
/// scaling.
pub struct LoadFlowRunner {
    loader: Arc<dyn CaseLoader>,
    solver: Arc<dyn LoadFlowSolver>,
    case: CaseSource,
    options: SolveOptions,
    limits: Limits,
}

impl LoadFlowRunner {
    pub fn new(
        loader: Arc<dyn CaseLoader>,
        solver: Arc<dyn LoadFlowSolver>,
        case: CaseSource,
        options: SolveOptions,
        limits: Limits,
    ) -> Self {
        Self {
            loader,
            solver,
            case,
            options,
            limits,
        }
    }

    pub fn case(&self) -> &CaseSource {
        &self.case
    }

    /// Solves the unmodified base case.
    ///
    /// # Errors
    ///
    /// See [`LoadFlowRunner::run`].
    pub async fn run_base(&self) -> Result<Summary, RunError> {
        self.run(None).await
    }

    /// Solves the case scaled by `scale`; the summary records the factors.
    ///
    /// # Errors
    ///
    /// See [`LoadFlowRunner::run`].
    pub async fn run_scenario(&self, scale: ScenarioScale) -> Result<Summary, RunError> {
        self.run(Some(scale)).await
    }

    /// Loads, optionally scales, solves and summarises the case.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::CaseLoad`] if the case cannot be loaded,
    /// [`RunError::Solver`] if the solver cannot complete (including
    /// timeouts), and [`RunError::Malformed`] if its output does not match
    /// the model. Non-convergence is a successful run.
    pub async fn run(&self, scenario: Option<ScenarioScale>) -> Result<Summary, RunError> {
        let mut model = self.loader.load(&self.case.path, self.case.f_hz).await?;
        if let Some(scale) = &scenario {
            scale.apply(&mut model);
        }

        let started = Instant::now();
        let result = self.solver.solve(&model, &self.options).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let case_path = self.case.path.display().to_string();
        let summary = summarize(&model, &result, &self.limits, &case_path, scenario)?;

        match summary.report() {
            Some(report) => info!(
                case = %case_path,
                load_scale = scenario.map(|s| s.load_scale),
                gen_scale = scenario.map(|s| s.gen_scale),
                elapsed_ms,
                voltage_violations = report.kpis.voltage_violations,
                line_over_limit = report.kpis.line_over_80pct,
                trafo_over_limit = report.kpis.trafo_over_80pct,
                "load flow converged"
            ),
            None => warn!(
                case = %case_path,
                load_scale = scenario.map(|s| s.load_scale),
                gen_scale = scenario.map(|s| s.gen_scale),
                elapsed_ms,
                "load flow did not converge"
            ),
        }

        Ok(summary)
    }
}
