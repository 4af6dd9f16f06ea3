//! Grid case model, case loading and scenario scaling.

/// Case loading seam and the JSON case loader.
pub mod loader;
pub mod model;
pub mod scenario;

pub use loader::{CaseLoadError, CaseLoader, JsonCaseLoader};
pub use model::{Bus, Generator, GridModel, Line, Load, Transformer};
pub use scenario::{ScenarioError, ScenarioScale};
