//! Problem manifest (`problem.toml`)
//!
//! ```toml
//! generator = "generator.star"
//! checker = "checker.star"   # or a standard checker: text, int, float, ...
//! checker_epsilon = 1e-6     # float/double checkers only
//! interactor = "interactor.star"
//! ```
//!
//! Plugin paths are relative to the directory holding the manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::{Checker, DriverRunner, IsolatedPluginChecker};
use crate::components::standard::StandardChecker;
use crate::config::get_config;

pub const MANIFEST_FILE: &str = "problem.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    generator: Option<String>,
    #[serde(default = "default_checker")]
    checker: String,
    checker_epsilon: Option<f64>,
    interactor: Option<String>,
}

fn default_checker() -> String {
    "text".to_string()
}

/// How a problem judges its tests
#[derive(Debug, Clone, PartialEq)]
pub enum CheckerSpec {
    Standard(StandardChecker),
    Plugin(PathBuf),
}

/// A problem's plugins, resolved against its directory
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemManifest {
    pub dir: PathBuf,
    pub generator: Option<PathBuf>,
    pub checker: CheckerSpec,
    pub interactor: Option<PathBuf>,
}

impl ProblemManifest {
    /// Load `problem.toml` from a problem directory
    pub fn load(problem_dir: &Path) -> Result<Self> {
        let path = problem_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Self::parse(&content, problem_dir).with_context(|| format!("Invalid manifest {:?}", path))
    }

    /// Parse manifest text; relative plugin paths resolve against `problem_dir`
    pub fn parse(content: &str, problem_dir: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)?;
        let epsilon = raw.checker_epsilon.unwrap_or(get_config().float_epsilon);
        if !(epsilon.is_finite() && epsilon >= 0.0) {
            anyhow::bail!("checker_epsilon must be a non-negative number, got {}", epsilon);
        }

        let checker = match StandardChecker::by_name(&raw.checker, epsilon) {
            Some(standard) => CheckerSpec::Standard(standard),
            None => CheckerSpec::Plugin(problem_dir.join(&raw.checker)),
        };
        debug!("Problem {:?} uses checker {:?}", problem_dir, checker);

        Ok(Self {
            dir: problem_dir.to_path_buf(),
            generator: raw.generator.map(|g| problem_dir.join(g)),
            checker,
            interactor: raw.interactor.map(|i| problem_dir.join(i)),
        })
    }

    /// Build the checker this problem uses
    pub fn checker(&self, runner: &DriverRunner) -> Result<Box<dyn Checker>> {
        let checker: Box<dyn Checker> = match &self.checker {
            CheckerSpec::Standard(standard) => Box::new(standard.clone()),
            CheckerSpec::Plugin(module) => {
                let module = module
                    .canonicalize()
                    .with_context(|| format!("Checker plugin {:?} not found", module))?;
                Box::new(IsolatedPluginChecker::new(runner.clone(), module))
            }
        };
        Ok(checker)
    }
}
