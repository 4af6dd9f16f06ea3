//! Service configuration: TOML file, environment overrides, validation.
//!
//! Resolution order is defaults, then the optional TOML file, then
//! environment variables, then command-line flags. The result is validated
//! once at startup and never changes afterwards.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::HeaderValue;
use serde::Deserialize;
use thiserror::Error;

use crate::solver::SolveOptions;
use crate::summary::Limits;

/// Top-level configuration parsed from TOML.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default)]
    pub case: CaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    /// Voltage band and thermal threshold reported with every result.
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which case to solve.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaseConfig {
    /// Path to the JSON grid case.
    pub path: PathBuf,
    /// Nominal system frequency (Hz).
    pub f_hz: f64,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cases/case.json"),
            f_hz: 50.0,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8000`.
    pub bind: String,
    /// Origins allowed to make credentialed cross-origin requests.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

/// External solver invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Solver executable.
    pub command: String,
    /// Fixed arguments for the executable.
    pub args: Vec<String>,
    /// Algorithm identifier passed to the solver.
    pub algorithm: String,
    /// Initialisation strategy passed to the solver.
    pub init: String,
    pub max_iteration: u32,
    pub tolerance_mva: f64,
    /// Wall-clock bound on one solve (seconds).
    pub timeout_secs: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let options = SolveOptions::default();
        Self {
            command: "pf-solve".to_string(),
            args: Vec::new(),
            algorithm: options.algorithm,
            init: options.init,
            max_iteration: options.max_iteration,
            tolerance_mva: options.tolerance_mva,
            timeout_secs: 60,
        }
    }
}

impl SolverConfig {
    pub fn options(&self) -> SolveOptions {
        SolveOptions {
            algorithm: self.algorithm.clone(),
            init: self.init.clone(),
            max_iteration: self.max_iteration,
            tolerance_mva: self.tolerance_mva,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,tower_http=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"case.f_hz"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ServiceConfig {
    /// Parses configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ServiceConfig::apply_env_from`].
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a variable lookup.
    ///
    /// Recognised variables: `CASE_PATH`, `F_HZ`, `LOADFLOW_BIND`,
    /// `LOADFLOW_ALLOWED_ORIGINS` (comma-separated), `LOADFLOW_SOLVER_CMD`,
    /// `LOADFLOW_SOLVER_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a numeric variable does not parse.
    pub fn apply_env_from<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("CASE_PATH") {
            self.case.path = PathBuf::from(path);
        }
        if let Some(raw) = var("F_HZ") {
            self.case.f_hz = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::new("F_HZ", format!("\"{raw}\" is not a number")))?;
        }
        if let Some(bind) = var("LOADFLOW_BIND") {
            self.server.bind = bind;
        }
        if let Some(raw) = var("LOADFLOW_ALLOWED_ORIGINS") {
            self.server.allowed_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(cmd) = var("LOADFLOW_SOLVER_CMD") {
            self.solver.command = cmd;
        }
        if let Some(raw) = var("LOADFLOW_SOLVER_TIMEOUT_SECS") {
            self.solver.timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::new(
                    "LOADFLOW_SOLVER_TIMEOUT_SECS",
                    format!("\"{raw}\" is not a whole number of seconds"),
                )
            })?;
        }
        Ok(())
    }

    /// Parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `server.bind` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|e| ConfigError::new("server.bind", format!("\"{}\": {e}", self.server.bind)))
    }

    /// Allowed origins as header values, skipping any that do not parse.
    pub fn origin_headers(&self) -> Vec<HeaderValue> {
        self.server
            .allowed_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect()
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !(self.case.f_hz.is_finite() && self.case.f_hz > 0.0) {
            errors.push(ConfigError::new("case.f_hz", "must be > 0"));
        }
        if self.case.path.as_os_str().is_empty() {
            errors.push(ConfigError::new("case.path", "must not be empty"));
        }

        if let Err(e) = self.socket_addr() {
            errors.push(e);
        }
        for origin in &self.server.allowed_origins {
            if HeaderValue::from_str(origin).is_err() {
                errors.push(ConfigError::new(
                    "server.allowed_origins",
                    format!("\"{origin}\" is not a valid origin"),
                ));
            }
        }

        let s = &self.solver;
        if s.command.trim().is_empty() {
            errors.push(ConfigError::new("solver.command", "must not be empty"));
        }
        if s.max_iteration == 0 {
            errors.push(ConfigError::new("solver.max_iteration", "must be > 0"));
        }
        if !(s.tolerance_mva.is_finite() && s.tolerance_mva > 0.0) {
            errors.push(ConfigError::new("solver.tolerance_mva", "must be > 0"));
        }
        if s.timeout_secs == 0 {
            errors.push(ConfigError::new("solver.timeout_secs", "must be > 0"));
        }

        let l = &self.limits;
        if !(l.vmin_pu.is_finite() && l.vmax_pu.is_finite() && l.vmin_pu < l.vmax_pu) {
            errors.push(ConfigError::new(
                "limits.vmin_pu",
                "must be finite and < limits.vmax_pu",
            ));
        }
        if !(l.thermal_warn_pct.is_finite() && l.thermal_warn_pct > 0.0) {
            errors.push(ConfigError::new("limits.thermal_warn_pct", "must be > 0"));
        }

        errors
    }
}
