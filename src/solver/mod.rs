//! Load-flow solver seam.
//!
//! The AC power-flow computation itself lives outside this crate. Anything
//! that can turn a [`GridModel`] into a [`SolveResult`] implements
//! [`LoadFlowSolver`]; [`external::ExternalSolver`] runs an out-of-process
//! solver command.

pub mod external;

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::grid::GridModel;

pub use external::ExternalSolver;

/// Solver invocation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Algorithm identifier; `"nr"` is Newton-Raphson.
    pub algorithm: String,
    /// Initialisation strategy for the iteration.
    pub init: String,
    /// Iteration cap for the solver.
    pub max_iteration: u32,
    /// Power mismatch tolerance (MVA).
    pub tolerance_mva: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            algorithm: "nr".to_string(),
            init: "auto".to_string(),
            max_iteration: 10,
            tolerance_mva: 1e-8,
        }
    }
}

/// Raw solver output.
///
/// Arrays are index-aligned with the model tables they describe. JSON `null`
/// entries decode to NaN so that downstream code sees a single "missing"
/// representation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SolveResult {
    pub converged: bool,
    /// Iterations used, when the solver reports it.
    #[serde(default)]
    pub iterations: Option<u32>,
    /// Per-bus voltage magnitude (pu).
    #[serde(default, deserialize_with = "nullable_floats")]
    pub vm_pu: Vec<f64>,
    /// Per-bus voltage angle (degrees).
    #[serde(default, deserialize_with = "nullable_floats")]
    pub va_degree: Vec<f64>,
    /// Per-line loading (%), absent when the solver did not populate it.
    #[serde(default, deserialize_with = "optional_nullable_floats")]
    pub line_loading_percent: Option<Vec<f64>>,
    /// Per-transformer loading (%), absent when the solver did not populate it.
    #[serde(default, deserialize_with = "optional_nullable_floats")]
    pub trafo_loading_percent: Option<Vec<f64>>,
}

impl SolveResult {
    /// A result that reports non-convergence and carries no tables.
    pub fn diverged() -> Self {
        Self::default()
    }
}

/// Failure to obtain a result from the solver.
///
/// Non-convergence is not an error; it is reported through
/// [`SolveResult::converged`].
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to start solver `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("solver i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("solver exceeded its time budget of {0:?}")]
    Timeout(Duration),
    #[error("solver exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("solver produced unreadable output: {0}")]
    MalformedOutput(#[source] serde_json::Error),
}

/// Computes steady-state bus voltages and branch loadings.
#[async_trait]
pub trait LoadFlowSolver: Send + Sync {
    /// Solves the model.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] when the solver could not be run to
    /// completion. A solve that finishes without converging is `Ok` with
    /// `converged == false`.
    async fn solve(
        &self,
        model: &GridModel,
        options: &SolveOptions,
    ) -> Result<SolveResult, SolverError>;
}

fn nullable_floats<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn optional_nullable_floats<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<f64>>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|v| v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect()))
}
