//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use loadflow_api::api::{AppState, router};
use loadflow_api::grid::{
    Bus, CaseLoadError, CaseLoader, Generator, GridModel, Line, Load, Transformer,
};
use loadflow_api::runner::{CaseSource, LoadFlowRunner};
use loadflow_api::solver::{LoadFlowSolver, SolveOptions, SolveResult, SolverError};
use loadflow_api::summary::Limits;

pub const CASE_PATH: &str = "cases/fixture.json";
pub const F_HZ: f64 = 50.0;

/// Three buses, two lines, one transformer, two loads, one generator.
pub fn fixture_model() -> GridModel {
    GridModel {
        name: Some("fixture".to_string()),
        bus: vec![Bus::default(), Bus::default(), Bus::default()],
        line: vec![
            Line {
                from_bus: 0,
                to_bus: 1,
                ..Line::default()
            },
            Line {
                from_bus: 1,
                to_bus: 2,
                ..Line::default()
            },
        ],
        trafo: vec![Transformer {
            hv_bus: 0,
            lv_bus: 2,
            ..Transformer::default()
        }],
        load: vec![
            Load {
                bus: 1,
                p_mw: 30.0,
                q_mvar: 10.0,
                ..Load::default()
            },
            Load {
                bus: 2,
                p_mw: 20.0,
                q_mvar: 5.0,
                ..Load::default()
            },
        ],
        generators: vec![Generator {
            bus: 0,
            p_mw: 45.0,
            ..Generator::default()
        }],
        ..GridModel::default()
    }
}

/// Converged result aligned with [`fixture_model`].
///
/// Voltages `[0.90, 1.00, 1.10]`, line loadings `[85.0, 50.0]`,
/// transformer loading `[60.0]`.
pub fn fixture_result() -> SolveResult {
    SolveResult {
        converged: true,
        iterations: Some(4),
        vm_pu: vec![0.90, 1.00, 1.10],
        va_degree: vec![0.0, -3.2, -6.1],
        line_loading_percent: Some(vec![85.0, 50.0]),
        trafo_loading_percent: Some(vec![60.0]),
    }
}

/// Hands out clones of a fixed model and counts calls.
pub struct FixtureLoader {
    model: Option<GridModel>,
    pub calls: AtomicUsize,
}

impl FixtureLoader {
    pub fn new(model: GridModel) -> Self {
        Self {
            model: Some(model),
            calls: AtomicUsize::new(0),
        }
    }

    /// A loader that always reports a missing case file.
    pub fn missing() -> Self {
        Self {
            model: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CaseLoader for FixtureLoader {
    async fn load(&self, path: &Path, f_hz: f64) -> Result<GridModel, CaseLoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut model = self
            .model
            .clone()
            .ok_or_else(|| CaseLoadError::NotFound(path.to_path_buf()))?;
        model.f_hz = f_hz;
        Ok(model)
    }
}

/// Returns a fixed result (or error) and records every model it was given.
pub struct FixtureSolver {
    outcome: Box<dyn Fn() -> Result<SolveResult, SolverError> + Send + Sync>,
    pub seen: Mutex<Vec<GridModel>>,
}

impl FixtureSolver {
    pub fn returning(result: SolveResult) -> Self {
        Self::with(move || Ok(result.clone()))
    }

    pub fn timing_out() -> Self {
        Self::with(|| Err(SolverError::Timeout(Duration::from_secs(60))))
    }

    pub fn with<F>(f: F) -> Self
    where
        F: Fn() -> Result<SolveResult, SolverError> + Send + Sync + 'static,
    {
        Self {
            outcome: Box::new(f),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn last_model(&self) -> Option<GridModel> {
        self.seen.lock().last().cloned()
    }
}

#[async_trait]
impl LoadFlowSolver for FixtureSolver {
    async fn solve(
        &self,
        model: &GridModel,
        _options: &SolveOptions,
    ) -> Result<SolveResult, SolverError> {
        self.seen.lock().push(model.clone());
        (self.outcome)()
    }
}

pub fn case_source() -> CaseSource {
    CaseSource {
        path: PathBuf::from(CASE_PATH),
        f_hz: F_HZ,
    }
}

pub fn runner_with(loader: Arc<FixtureLoader>, solver: Arc<FixtureSolver>) -> LoadFlowRunner {
    LoadFlowRunner::new(
        loader,
        solver,
        case_source(),
        SolveOptions::default(),
        Limits::default(),
    )
}

/// Runner over the fixture model and the fixture result.
pub fn fixture_runner() -> (LoadFlowRunner, Arc<FixtureLoader>, Arc<FixtureSolver>) {
    let loader = Arc::new(FixtureLoader::new(fixture_model()));
    let solver = Arc::new(FixtureSolver::returning(fixture_result()));
    (runner_with(loader.clone(), solver.clone()), loader, solver)
}

pub const DEV_ORIGIN: &str = "http://localhost:5173";

/// Router and the solver behind it.
pub fn fixture_app(solver: FixtureSolver) -> (axum::Router, Arc<AppState>, Arc<FixtureSolver>) {
    let loader = Arc::new(FixtureLoader::new(fixture_model()));
    let solver = Arc::new(solver);
    let state = Arc::new(AppState::new(runner_with(loader, solver.clone())));
    let origins = vec![
        DEV_ORIGIN.parse().expect("static origin"),
        "http://localhost:3000".parse().expect("static origin"),
    ];
    (router(state.clone(), origins), state, solver)
}
