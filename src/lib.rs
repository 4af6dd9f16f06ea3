//! Load-flow dashboard service.
//!
//! Loads a static grid case, hands it to an external AC power-flow solver,
//! and reshapes the solver output into JSON-safe summaries: voltage-band
//! violations, most-loaded branches, aggregate KPIs and plottable series.
//! Clients can also request what-if scenarios that scale load and
//! generation uniformly.

pub mod api;
pub mod cache;
pub mod config;
pub mod grid;
pub mod runner;
/// Load-flow solver seam and the external solver.
pub mod solver;
pub mod summary;
pub mod telemetry;
