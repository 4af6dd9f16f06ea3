//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde_json::Value;

use super::AppState;
use super::error::ApiError;
use super::types::HealthResponse;
use crate::grid::ScenarioScale;
use crate::summary::Summary;

/// Returns the configured case reference; never runs the solver.
///
/// `GET /api/health` → 200 + `HealthResponse` JSON
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let case = state.runner.case();
    Json(HealthResponse {
        ok: true,
        case_path: case.path.display().to_string(),
        f_hz: case.f_hz,
    })
}

/// Returns the cached summary, solving the base case on first use.
///
/// `GET /api/results` → 200 + `Summary` JSON (converged or not)
pub async fn get_results(State(state): State<Arc<AppState>>) -> Result<Json<Summary>, ApiError> {
    if let Some(cached) = state.cache.get() {
        return Ok(Json(Summary::clone(&cached)));
    }

    let summary = state.runner.run_base().await?;
    let cached = state.cache.fill_if_empty(summary);
    Ok(Json(Summary::clone(&cached)))
}

/// Solves a scaled scenario and replaces the cached summary with it.
///
/// `POST /api/run` with `{"load_scale"?: n, "gen_scale"?: n}` → 200 + `Summary`
/// An empty body runs the unscaled scenario. Unusable fields fall back to
/// `1.0`; zero, negative or non-finite factors → 400.
pub async fn run_scenario(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Summary>, ApiError> {
    let payload: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let scale = ScenarioScale::from_body(&payload)?;

    let summary = state.runner.run_scenario(scale).await?;
    let cached = state.cache.store(summary);
    Ok(Json(Summary::clone(&cached)))
}
