//! Check outcomes and the exit-code contract of the drivers

use std::fmt;

/// Process exit codes understood by the grading host
pub mod exit_codes {
    pub const MATCH: i32 = 0;
    pub const MISMATCH: i32 = 1;
    pub const LOAD_FAILED: i32 = 2; // module file missing or unparsable
    pub const INSTANTIATE_FAILED: i32 = 3; // parsed unit cannot be bound
    pub const INIT_FAILED: i32 = 4; // top-level execution raised
    pub const MATCH_FAILED: i32 = 5; // match() raised
    pub const USAGE: i32 = 64; // EX_USAGE
    pub const ABNORMAL: i32 = 70; // EX_SOFTWARE, uncaught failure
}

/// Where a plugin failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Load,
    Instantiate,
    Initialize,
    Invoke,
}

impl FailureStage {
    /// Exit code used by the isolated checker protocol
    pub fn exit_code(self) -> i32 {
        match self {
            FailureStage::Load => exit_codes::LOAD_FAILED,
            FailureStage::Instantiate => exit_codes::INSTANTIATE_FAILED,
            FailureStage::Initialize => exit_codes::INIT_FAILED,
            FailureStage::Invoke => exit_codes::MATCH_FAILED,
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Load => "load",
            FailureStage::Instantiate => "instantiate",
            FailureStage::Initialize => "initialize",
            FailureStage::Invoke => "invoke",
        };
        write!(f, "{}", s)
    }
}

/// Clean result of a match: never carries an error
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub matched: bool,
    pub diagnostic: Option<String>,
}

impl MatchOutcome {
    pub fn matched() -> Self {
        Self {
            matched: true,
            diagnostic: None,
        }
    }

    pub fn mismatch(diagnostic: impl Into<String>) -> Self {
        Self {
            matched: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// How a checker driver reports failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Arguments, stdin and working directory are provided; failures terminate abnormally
    ContextAware,
    /// Length-prefixed payload on stdin; failures map to per-stage exit codes
    Isolated,
}

/// Everything a checker run can end with
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Matched { diagnostic: Option<String> },
    Mismatched { diagnostic: Option<String> },
    Failed { stage: FailureStage, message: String },
}

impl CheckOutcome {
    pub fn failed(stage: FailureStage, message: impl Into<String>) -> Self {
        CheckOutcome::Failed {
            stage,
            message: message.into(),
        }
    }

    /// Text to show the host, if any
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            CheckOutcome::Matched { diagnostic } | CheckOutcome::Mismatched { diagnostic } => {
                diagnostic.as_deref()
            }
            CheckOutcome::Failed { message, .. } => Some(message),
        }
    }

    pub fn exit_code(&self, mode: CheckMode) -> i32 {
        match (self, mode) {
            (CheckOutcome::Matched { .. }, _) => exit_codes::MATCH,
            (CheckOutcome::Mismatched { .. }, _) => exit_codes::MISMATCH,
            (CheckOutcome::Failed { .. }, CheckMode::ContextAware) => exit_codes::ABNORMAL,
            (CheckOutcome::Failed { stage, .. }, CheckMode::Isolated) => stage.exit_code(),
        }
    }
}

impl From<MatchOutcome> for CheckOutcome {
    fn from(outcome: MatchOutcome) -> Self {
        if outcome.matched {
            CheckOutcome::Matched {
                diagnostic: outcome.diagnostic,
            }
        } else {
            CheckOutcome::Mismatched {
                diagnostic: outcome.diagnostic,
            }
        }
    }
}
