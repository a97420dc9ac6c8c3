//! Core data model shared by the drivers and the host runner

pub mod outcome;
pub mod params;
pub mod testcase;

pub use outcome::{exit_codes, CheckMode, CheckOutcome, FailureStage, MatchOutcome};
pub use testcase::{ledger_path, Artifact, TestCase, LEDGER_FILE};
