//! Driver runner
//!
//! Spawns the harness binary directly (drivers are trusted; the plugins they
//! load are problem-setter code, not contestant code).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{DriverCommand, DriverOutcome, DriverStatus};
use crate::config::get_config;
use crate::drivers::checker::CheckFiles;

/// Outcome of an interactive session
#[derive(Debug)]
pub struct InteractionOutcome {
    /// The interactor driver; its stdout went to the solution
    pub interactor: DriverOutcome,
    /// The process under test
    pub solution: DriverStatus,
}

/// Runner that executes the harness driver binary
#[derive(Debug, Clone)]
pub struct DriverRunner {
    program: PathBuf,
    timeout_secs: u64,
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn status_of(status: std::process::ExitStatus) -> DriverStatus {
    match status.code() {
        Some(code) => DriverStatus::Exited(code),
        None => DriverStatus::Signaled,
    }
}

impl DriverRunner {
    pub fn new(program: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout_secs,
        }
    }

    /// Runner for the configured binary and timeout
    pub fn from_config() -> Self {
        let config = get_config();
        Self::new(config.driver_bin.clone(), config.timeout_secs)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, cmd: &DriverCommand) -> Command {
        let mut command = Command::new(&self.program);
        command.args(cmd.to_vec()).kill_on_drop(true);
        if let Some(dir) = &cmd.work_dir {
            command.current_dir(dir);
        }
        command
    }

    /// Run one driver invocation to completion or timeout
    pub async fn execute(&self, cmd: &DriverCommand) -> Result<DriverOutcome> {
        debug!("Running driver: {:?} {:?}", self.program, cmd.to_vec());

        let mut command = self.command(cmd);
        command
            .stdin(if cmd.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn driver {:?}", self.program))?;

        // Feed stdin from a separate task so a chatty driver cannot deadlock us
        let feeder = match (cmd.stdin.clone(), child.stdin.take()) {
            (Some(data), Some(mut stdin)) => Some(tokio::spawn(async move {
                stdin.write_all(&data).await?;
                stdin.shutdown().await
            })),
            _ => None,
        };

        let waited = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await;

        if let Some(feeder) = feeder {
            match feeder.await {
                Ok(Err(e)) => debug!("Driver closed stdin early: {}", e),
                Err(e) => warn!("Stdin feeder task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }

        let output = match waited {
            Ok(output) => output.context("Failed to wait for driver")?,
            Err(_) => {
                warn!(
                    "Driver {:?} timed out after {}s",
                    cmd.subcommand, self.timeout_secs
                );
                return Ok(DriverOutcome {
                    status: DriverStatus::TimedOut,
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
        };

        Ok(DriverOutcome {
            status: status_of(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Generate a test suite into `work_dir`
    pub async fn generate(&self, module: &Path, work_dir: &Path) -> Result<DriverOutcome> {
        let cmd = DriverCommand::new("generate").with_args([arg(module), arg(work_dir)]);
        self.execute(&cmd).await
    }

    /// Context-aware check of one test
    pub async fn check(&self, files: &CheckFiles) -> Result<DriverOutcome> {
        let cmd = DriverCommand::new("check").with_args([
            arg(&files.module),
            arg(&files.work_dir),
            arg(&files.arguments),
            arg(&files.stdin),
            arg(&files.output),
            arg(&files.answer),
        ]);
        self.execute(&cmd).await
    }

    /// Plain file check of `observed` against `reference`
    pub async fn check_files(
        &self,
        module: &Path,
        work_dir: &Path,
        observed: &Path,
        reference: &Path,
    ) -> Result<DriverOutcome> {
        let cmd = DriverCommand::new("check-files").with_args([
            arg(module),
            arg(work_dir),
            arg(observed),
            arg(reference),
        ]);
        self.execute(&cmd).await
    }

    /// Isolated check: lengths as arguments, both outputs on stdin, run in `test_dir`
    pub async fn check_isolated(
        &self,
        module: &Path,
        observed: &[u8],
        standard: &[u8],
        test_dir: &Path,
    ) -> Result<DriverOutcome> {
        let mut payload = Vec::with_capacity(observed.len() + standard.len());
        payload.extend_from_slice(observed);
        payload.extend_from_slice(standard);

        let cmd = DriverCommand::new("check-isolated")
            .with_args([
                observed.len().to_string(),
                standard.len().to_string(),
                arg(module),
            ])
            .with_work_dir(test_dir)
            .with_stdin(payload);
        self.execute(&cmd).await
    }

    /// Run an interactor against `solution`, cross-wiring their stdio
    pub async fn interact(
        &self,
        module: &Path,
        work_dir: &Path,
        input_data: Option<&Path>,
        solution: &mut Command,
    ) -> Result<InteractionOutcome> {
        let mut args = vec![arg(module), arg(work_dir)];
        args.extend(input_data.map(arg));
        let cmd = DriverCommand::new("interact").with_args(args);

        let mut driver = self
            .command(&cmd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn driver {:?}", self.program))?;
        let mut solution = solution
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn solution")?;

        let (mut from_driver, mut to_driver) = driver
            .stdout
            .take()
            .zip(driver.stdin.take())
            .context("Driver stdio is not piped")?;
        let (mut from_solution, mut to_solution) = solution
            .stdout
            .take()
            .zip(solution.stdin.take())
            .context("Solution stdio is not piped")?;

        let forward = tokio::spawn(async move {
            tokio::io::copy(&mut from_driver, &mut to_solution).await
        });
        let backward = tokio::spawn(async move {
            tokio::io::copy(&mut from_solution, &mut to_driver).await
        });

        let limit = Duration::from_secs(self.timeout_secs);
        let interactor = match tokio::time::timeout(limit, driver.wait_with_output()).await {
            Ok(output) => {
                let output = output.context("Failed to wait for interactor")?;
                DriverOutcome {
                    status: status_of(output.status),
                    stdout: String::new(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                }
            }
            Err(_) => {
                warn!("Interactor timed out after {}s", self.timeout_secs);
                DriverOutcome {
                    status: DriverStatus::TimedOut,
                    stdout: String::new(),
                    stderr: String::new(),
                }
            }
        };

        let solution_status = match tokio::time::timeout(limit, solution.wait()).await {
            Ok(status) => status_of(status.context("Failed to wait for solution")?),
            Err(_) => {
                solution.kill().await.ok();
                DriverStatus::TimedOut
            }
        };

        forward.abort();
        backward.abort();

        Ok(InteractionOutcome {
            interactor,
            solution: solution_status,
        })
    }
}

impl Default for DriverRunner {
    fn default() -> Self {
        Self::from_config()
    }
}
