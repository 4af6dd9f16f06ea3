//! loadflow-api entry point: CLI, configuration and server wiring.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use loadflow_api::api::{self, AppState};
use loadflow_api::config::ServiceConfig;
use loadflow_api::grid::JsonCaseLoader;
use loadflow_api::runner::{CaseSource, LoadFlowRunner};
use loadflow_api::solver::ExternalSolver;
use loadflow_api::telemetry::{init_tracing, shutdown_signal};

/// Serve load-flow results and what-if scenarios over HTTP.
#[derive(Debug, Parser)]
#[command(name = "loadflow-api", version)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Grid case file, overrides config and CASE_PATH
    #[arg(long)]
    case: Option<PathBuf>,
    /// Listen address, overrides config and LOADFLOW_BIND
    #[arg(long)]
    bind: Option<String>,
}

fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut cfg = match &cli.config {
        Some(path) => ServiceConfig::from_toml_file(path)?,
        None => ServiceConfig::default(),
    };
    cfg.apply_env()?;

    if let Some(case) = &cli.case {
        cfg.case.path = case.clone();
    }
    if let Some(bind) = &cli.bind {
        cfg.server.bind = bind.clone();
    }

    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("{} configuration error(s)", errors.len());
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    init_tracing(&cfg.logging);

    if !cfg.case.path.exists() {
        warn!(
            path = %cfg.case.path.display(),
            "case file does not exist yet; runs will fail until it does"
        );
    }

    let solver = ExternalSolver::new(
        cfg.solver.command.clone(),
        cfg.solver.args.clone(),
        cfg.solver.timeout(),
    );
    let runner = LoadFlowRunner::new(
        Arc::new(JsonCaseLoader),
        Arc::new(solver),
        CaseSource {
            path: cfg.case.path.clone(),
            f_hz: cfg.case.f_hz,
        },
        cfg.solver.options(),
        cfg.limits,
    );
    let state = Arc::new(AppState::new(runner));

    let addr = cfg.socket_addr()?;
    info!(
        case = %cfg.case.path.display(),
        f_hz = cfg.case.f_hz,
        solver = %cfg.solver.command,
        origins = ?cfg.server.allowed_origins,
        "starting load-flow service"
    );

    let app = api::router(state, cfg.origin_headers());
    api::serve(app, addr, shutdown_signal())
        .await
        .with_context(|| format!("serving on {addr}"))?;
    Ok(())
}
