//! Case loading.
//!
//! [`CaseLoader`] is the seam to whatever produces a [`GridModel`]; the
//! service ships [`JsonCaseLoader`] for cases stored as JSON.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::model::GridModel;

/// Failure to produce a grid model from a case reference.
#[derive(Debug, Error)]
pub enum CaseLoadError {
    #[error("case file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read case file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("case file is not a valid grid model: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("inconsistent grid model: {0}")]
    Invalid(String),
}

/// Produces a fresh grid model for every call.
#[async_trait]
pub trait CaseLoader: Send + Sync {
    /// Loads the case at `path`, using `f_hz` as the nominal frequency.
    ///
    /// # Errors
    ///
    /// Returns a [`CaseLoadError`] if the case is missing or malformed.
    async fn load(&self, path: &Path, f_hz: f64) -> Result<GridModel, CaseLoadError>;
}

/// Reads a [`GridModel`] serialised as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCaseLoader;

impl JsonCaseLoader {
    /// Parses and validates a case from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`CaseLoadError::Parse`] for invalid JSON and
    /// [`CaseLoadError::Invalid`] when an element references a missing bus.
    pub fn parse(raw: &str, f_hz: f64) -> Result<GridModel, CaseLoadError> {
        let mut model: GridModel = serde_json::from_str(raw)?;
        model.f_hz = f_hz;

        let problems = model.dangling_references();
        if !problems.is_empty() {
            return Err(CaseLoadError::Invalid(problems.join("; ")));
        }
        Ok(model)
    }
}

#[async_trait]
impl CaseLoader for JsonCaseLoader {
    async fn load(&self, path: &Path, f_hz: f64) -> Result<GridModel, CaseLoadError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CaseLoadError::NotFound(path.to_path_buf())
            } else {
                CaseLoadError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        let model = Self::parse(&raw, f_hz)?;
        debug!(
            path = %path.display(),
            n_bus = model.bus.len(),
            n_line = model.line.len(),
            n_trafo = model.trafo.len(),
            "case loaded"
        );
        Ok(model)
    }
}
