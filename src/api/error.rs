//! Mapping of run failures to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::types::ErrorResponse;
use crate::grid::ScenarioError;
use crate::runner::RunError;
use crate::solver::SolverError;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    BadRequest(String),
    #[error(transparent)]
    InvalidScenario(#[from] ScenarioError),
    #[error(transparent)]
    Run(#[from] RunError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidScenario(_) => StatusCode::BAD_REQUEST,
            Self::Run(RunError::Solver(SolverError::Timeout(_))) => StatusCode::GATEWAY_TIMEOUT,
            Self::Run(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BadRequest",
            Self::InvalidScenario(_) => "InvalidScenario",
            Self::Run(RunError::CaseLoad(_)) => "CaseLoadError",
            Self::Run(RunError::Solver(SolverError::Timeout(_))) => "SolverTimeout",
            Self::Run(RunError::Solver(_)) => "SolverError",
            Self::Run(RunError::Malformed(_)) => "MalformedSolveResult",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "load flow run failed");
            match status {
                StatusCode::GATEWAY_TIMEOUT => "The solver did not finish in time".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            tracing::debug!(error = %self, "client error");
            self.to_string()
        };

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::grid::CaseLoadError;
    use crate::summary::SummaryError;

    #[test]
    fn status_codes() {
        let scenario = ApiError::from(ScenarioError::OutOfRange {
            field: "load_scale",
            value: -1.0,
        });
        assert_eq!(scenario.status_code(), StatusCode::BAD_REQUEST);

        let timeout = ApiError::from(RunError::from(SolverError::Timeout(Duration::from_secs(1))));
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.error_type(), "SolverTimeout");

        let missing = ApiError::from(RunError::from(CaseLoadError::NotFound(PathBuf::from(
            "x.json",
        ))));
        assert_eq!(missing.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing.error_type(), "CaseLoadError");

        let malformed = ApiError::from(RunError::from(SummaryError::Malformed {
            table: "vm_pu",
            expected: 3,
            actual: 1,
        }));
        assert_eq!(malformed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_errors_echo_their_message() {
        let err = ApiError::from(ScenarioError::OutOfRange {
            field: "gen_scale",
            value: 0.0,
        });
        assert_eq!(err.to_string(), "gen_scale must be a finite number > 0, got 0");
    }
}
