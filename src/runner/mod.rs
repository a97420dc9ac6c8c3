//! Runner module - host-side execution of the drivers
//!
//! The grading host never loads plugins itself. It spawns one driver process
//! per unit of work and reads the exit code:
//! - `DriverRunner`: spawns the harness binary with a timeout
//! - `Checker`: judges one test's output, in-process or through a plugin
//! - `ProblemManifest`: which plugins a problem uses
//!
//! The runner module does NOT:
//! - Sandbox the solution or measure its resources
//! - Interpret generator output beyond success or failure

pub mod checker;
pub mod driver;
pub mod problem;

use std::path::{Path, PathBuf};

/// One driver invocation
#[derive(Debug, Clone)]
pub struct DriverCommand {
    /// Harness subcommand (`generate`, `check`, `check-isolated`, `interact`)
    pub subcommand: String,
    /// Positional arguments after the subcommand
    pub args: Vec<String>,
    /// Working directory of the driver process
    pub work_dir: Option<PathBuf>,
    /// Bytes written to the driver's stdin, which is then closed
    pub stdin: Option<Vec<u8>>,
}

impl DriverCommand {
    pub fn new(subcommand: impl Into<String>) -> Self {
        Self {
            subcommand: subcommand.into(),
            args: Vec::new(),
            work_dir: None,
            stdin: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Full argument vector (subcommand + args)
    pub fn to_vec(&self) -> Vec<String> {
        let mut v = vec![self.subcommand.clone()];
        v.extend(self.args.iter().cloned());
        v
    }
}

/// Execution status (raw, no verdict interpretation)
#[derive(Debug, Clone, PartialEq)]
pub enum DriverStatus {
    /// Driver exited with the given code
    Exited(i32),
    /// Killed by a signal
    Signaled,
    /// Killed by the host after the timeout
    TimedOut,
}

/// Outcome of one driver run
#[derive(Debug)]
pub struct DriverOutcome {
    pub status: DriverStatus,
    pub stdout: String,
    pub stderr: String,
}

impl DriverOutcome {
    /// Exit code, or -1 when the driver did not exit on its own
    pub fn exit_code(&self) -> i32 {
        match self.status {
            DriverStatus::Exited(code) => code,
            DriverStatus::Signaled | DriverStatus::TimedOut => -1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DriverStatus::Exited(0)
    }

    /// Stdout and stderr joined, for error reports
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

// Re-exports
pub use checker::{Checker, IsolatedPluginChecker};
pub use driver::DriverRunner;
pub use problem::ProblemManifest;
