//! Out-of-process solver.
//!
//! The child receives one JSON document on stdin (the [`SolveOptions`]
//! fields plus the model under `net`) and must print one [`SolveResult`]
//! document on stdout before exiting.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{LoadFlowSolver, SolveOptions, SolveResult, SolverError};
use crate::grid::GridModel;

#[derive(Serialize)]
struct SolveRequest<'a> {
    #[serde(flatten)]
    options: &'a SolveOptions,
    net: &'a GridModel,
}

/// Runs a solver executable per solve, bounded by a wall-clock timeout.
#[derive(Debug, Clone)]
pub struct ExternalSolver {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalSolver {
    /// # Arguments
    ///
    /// * `command` - Executable to spawn
    /// * `args` - Arguments passed on every invocation
    /// * `timeout` - Upper bound on one complete exchange
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    async fn exchange(&self, payload: Vec<u8>) -> Result<std::process::Output, SolverError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SolverError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // Feed stdin while stdout and stderr drain, so neither side stalls on
        // a full pipe.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        match fed {
            // The child stopped reading; its exit status decides the outcome.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!(command = %self.command, "solver closed stdin early");
            }
            Err(e) => return Err(e.into()),
            Ok(()) => {}
        }
        Ok(output)
    }
}

#[async_trait]
impl LoadFlowSolver for ExternalSolver {
    async fn solve(
        &self,
        model: &GridModel,
        options: &SolveOptions,
    ) -> Result<SolveResult, SolverError> {
        let payload = serde_json::to_vec(&SolveRequest {
            options,
            net: model,
        })
        .map_err(std::io::Error::from)?;

        let started = Instant::now();
        // Dropping the exchange future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, self.exchange(payload))
            .await
            .map_err(|_| {
                warn!(command = %self.command, timeout = ?self.timeout, "solver timed out");
                SolverError::Timeout(self.timeout)
            })??;

        if !output.status.success() {
            return Err(SolverError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let result: SolveResult =
            serde_json::from_slice(&output.stdout).map_err(SolverError::MalformedOutput)?;
        debug!(
            command = %self.command,
            elapsed_ms = started.elapsed().as_millis() as u64,
            converged = result.converged,
            iterations = ?result.iterations,
            "solver finished"
        );
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::grid::Bus;

    /// A model whose request is far larger than a pipe buffer.
    fn large_model() -> GridModel {
        GridModel {
            bus: (0..20_000)
                .map(|i| Bus {
                    name: Some(format!("bus-{i}")),
                    vn_kv: 110.0,
                    ..Bus::default()
                })
                .collect(),
            ..GridModel::default()
        }
    }

    fn sh(script: &str, timeout: Duration) -> ExternalSolver {
        ExternalSolver::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[tokio::test]
    async fn reads_result_from_stdout() {
        let solver = sh(
            r#"cat > /dev/null; echo '{"converged": true, "iterations": 4, "vm_pu": [1.0, 0.98], "va_degree": [0.0, -1.5]}'"#,
            Duration::from_secs(10),
        );
        let result = solver
            .solve(&GridModel::default(), &SolveOptions::default())
            .await
            .unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, Some(4));
        assert_eq!(result.vm_pu, vec![1.0, 0.98]);
    }

    #[tokio::test]
    async fn request_carries_options_and_net() {
        // Converges only if both the options and the model reached stdin.
        let solver = sh(
            r#"input=$(cat); case "$input" in *'"algorithm":"nr"'*'"net":'*) echo '{"converged": true}';; *) echo '{"converged": false}';; esac"#,
            Duration::from_secs(10),
        );
        let result = solver
            .solve(&GridModel::default(), &SolveOptions::default())
            .await
            .unwrap();
        assert!(result.converged);
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure() {
        let solver = sh("cat > /dev/null; echo boom >&2; exit 3", Duration::from_secs(10));
        let err = solver
            .solve(&GridModel::default(), &SolveOptions::default())
            .await
            .unwrap_err();
        match err {
            SolverError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn garbage_output_is_malformed() {
        let solver = sh("cat > /dev/null; echo not-json", Duration::from_secs(10));
        let err = solver
            .solve(&GridModel::default(), &SolveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SolverError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn slow_solver_times_out() {
        let solver = sh("cat > /dev/null; sleep 5", Duration::from_millis(200));
        let err = solver
            .solve(&GridModel::default(), &SolveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SolverError::Timeout(d) if d == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn missing_executable_is_spawn_error() {
        let solver = ExternalSolver::new(
            "/nonexistent/loadflow-solver",
            Vec::new(),
            Duration::from_secs(1),
        );
        let err = solver
            .solve(&GridModel::default(), &SolveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SolverError::Spawn { .. }));
    }

    #[tokio::test]
    async fn early_exit_reports_status_and_stderr() {
        let solver = sh("echo 'bad license' >&2; exit 3", Duration::from_secs(10));
        let err = solver
            .solve(&large_model(), &SolveOptions::default())
            .await
            .unwrap_err();
        match err {
            SolverError::Failed { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "bad license");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn chatty_stderr_does_not_stall_large_request() {
        let solver = sh(
            r#"head -c 200000 /dev/zero | tr '\0' x >&2; cat > /dev/null; echo '{"converged": false}'"#,
            Duration::from_secs(10),
        );
        let result = solver
            .solve(&large_model(), &SolveOptions::default())
            .await
            .unwrap();
        assert!(!result.converged);
    }
}
