//! API response types that are not summaries.

use serde::Serialize;

/// `GET /api/health` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Case file every run starts from.
    pub case_path: String,
    /// Nominal system frequency (Hz).
    pub f_hz: f64,
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    /// Error kind, e.g. `"InvalidScenario"`.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}
