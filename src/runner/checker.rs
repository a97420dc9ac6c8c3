//! Host-side checkers
//!
//! A `Checker` decides whether one test's observed output is accepted.
//! Standard checkers run in-process; plugin checkers run through the isolated
//! checker driver.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{DriverOutcome, DriverRunner, DriverStatus};
use crate::components::standard::StandardChecker;
use crate::core::{exit_codes, FailureStage};

/// Judges one test's output
#[async_trait]
pub trait Checker: Send + Sync {
    /// `Ok(true)` accepted, `Ok(false)` rejected, `Err` when the checker itself broke
    async fn check(&self, observed: &[u8], standard: &[u8], test_dir: &Path) -> Result<bool>;
}

#[async_trait]
impl Checker for StandardChecker {
    async fn check(&self, observed: &[u8], standard: &[u8], _test_dir: &Path) -> Result<bool> {
        let outcome = self.compare(observed, standard);
        if let Some(diagnostic) = &outcome.diagnostic {
            debug!("{:?} checker: {}", self, diagnostic);
        }
        Ok(outcome.matched)
    }
}

/// Stage a failing isolated checker stopped at, from its exit code
fn failure_stage(exit_code: i32) -> Option<FailureStage> {
    match exit_code {
        exit_codes::LOAD_FAILED => Some(FailureStage::Load),
        exit_codes::INSTANTIATE_FAILED => Some(FailureStage::Instantiate),
        exit_codes::INIT_FAILED => Some(FailureStage::Initialize),
        exit_codes::MATCH_FAILED => Some(FailureStage::Invoke),
        _ => None,
    }
}

/// Convert an isolated checker run to an accept/reject decision
fn interpret(outcome: &DriverOutcome) -> Result<bool> {
    match outcome.status {
        DriverStatus::Exited(exit_codes::MATCH) => Ok(true),
        DriverStatus::Exited(exit_codes::MISMATCH) => Ok(false),
        DriverStatus::Exited(code) => match failure_stage(code) {
            Some(stage) => bail!(
                "Checker failed at {} stage (exit code {}): {}",
                stage,
                code,
                outcome.combined_output()
            ),
            None => {
                warn!("Unknown checker exit code: {}", code);
                bail!(
                    "Checker exited with code {}: {}",
                    code,
                    outcome.combined_output()
                )
            }
        },
        DriverStatus::Signaled => bail!("Checker was killed: {}", outcome.combined_output()),
        DriverStatus::TimedOut => bail!("Checker timed out"),
    }
}

/// Checker plugin run through the isolated checker driver
#[derive(Debug, Clone)]
pub struct IsolatedPluginChecker {
    runner: DriverRunner,
    module: PathBuf,
}

impl IsolatedPluginChecker {
    /// `module` should be absolute: the driver runs inside each test directory
    pub fn new(runner: DriverRunner, module: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            module: module.into(),
        }
    }

    pub fn module(&self) -> &Path {
        &self.module
    }
}

#[async_trait]
impl Checker for IsolatedPluginChecker {
    async fn check(&self, observed: &[u8], standard: &[u8], test_dir: &Path) -> Result<bool> {
        let outcome = self
            .runner
            .check_isolated(&self.module, observed, standard, test_dir)
            .await?;
        debug!(
            "Isolated checker {:?} finished with {:?}",
            self.module, outcome.status
        );
        interpret(&outcome)
    }
}
