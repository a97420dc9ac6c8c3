//! Harness configuration
//!
//! Loaded once from the environment (after `.env`), defaults otherwise.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use tracing::warn;

use crate::components::standard::DEFAULT_FLOAT_EPSILON;

/// Harness configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Driver binary the host runner spawns (default: `judge-harness` on PATH)
    pub driver_bin: PathBuf,
    /// Host-side limit on a single driver run, in seconds (default: 30)
    pub timeout_secs: u64,
    /// Tolerance of the `float`/`double` standard checkers (default: 1e-6)
    pub float_epsilon: f64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            driver_bin: PathBuf::from("judge-harness"),
            timeout_secs: 30,
            float_epsilon: DEFAULT_FLOAT_EPSILON,
        }
    }
}

impl HarnessConfig {
    /// Build from `JUDGE_HARNESS_*` variables, keeping defaults for unset ones
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(bin) = lookup("JUDGE_HARNESS_BIN") {
            config.driver_bin = PathBuf::from(bin);
        }
        if let Some(secs) = lookup("JUDGE_HARNESS_TIMEOUT_SECS") {
            config.timeout_secs = secs
                .parse()
                .with_context(|| format!("Invalid JUDGE_HARNESS_TIMEOUT_SECS: {}", secs))?;
        }
        if let Some(epsilon) = lookup("JUDGE_HARNESS_FLOAT_EPSILON") {
            let value: f64 = epsilon
                .parse()
                .with_context(|| format!("Invalid JUDGE_HARNESS_FLOAT_EPSILON: {}", epsilon))?;
            if !(value.is_finite() && value >= 0.0) {
                anyhow::bail!("JUDGE_HARNESS_FLOAT_EPSILON must be a non-negative number, got {}", epsilon);
            }
            config.float_epsilon = value;
        }

        Ok(config)
    }
}

/// Global harness configuration
static HARNESS_CONFIG: OnceLock<HarnessConfig> = OnceLock::new();

/// Initialize the global configuration from the environment
pub fn init_config() -> anyhow::Result<&'static HarnessConfig> {
    let config = HarnessConfig::from_env()?;
    HARNESS_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Harness configuration already initialized"))?;
    Ok(get_config())
}

/// Get harness configuration
pub fn get_config() -> &'static HarnessConfig {
    HARNESS_CONFIG.get().unwrap_or_else(|| {
        static DEFAULT: OnceLock<HarnessConfig> = OnceLock::new();

        warn!("Harness configuration not initialized, using default");
        DEFAULT.get_or_init(HarnessConfig::default)
    })
}
