//! Capability interfaces of the three plugin contracts
//!
//! Each optional generator capability is its own single-method trait. A
//! generator exposes the ones it supports through the accessors on
//! [`TestGenerator`]; the driver skips a step whenever the accessor returns
//! `None`. Script plugins implement these by probing the module for function
//! names, Rust generators implement them directly.

pub mod standard;

use std::path::Path;

use crate::core::{MatchOutcome, TestCase};
use crate::plugin::{PluginError, SolutionChannel};

/// Writes auxiliary files for a test into its `.dir` directory
pub trait DirectoryContentProducer {
    fn directory_content(&self, test: TestCase, dir: &Path) -> anyhow::Result<()>;
}

/// Produces the expected answer of a test
pub trait AnswerProducer {
    fn answer(&self, test: TestCase) -> anyhow::Result<Vec<u8>>;
}

/// Produces the input data of a test
pub trait InputProducer {
    fn input(&self, test: TestCase) -> anyhow::Result<Vec<u8>>;
}

/// Produces the command line tokens of a test
pub trait ArgumentsProducer {
    fn arguments(&self, test: TestCase) -> anyhow::Result<Vec<String>>;
}

/// A problem's test generator
pub trait TestGenerator {
    /// Total number of tests; required
    fn tests_count(&self) -> anyhow::Result<u32>;

    fn directory_content_producer(&self) -> Option<&dyn DirectoryContentProducer> {
        None
    }

    fn answer_producer(&self) -> Option<&dyn AnswerProducer> {
        None
    }

    fn input_producer(&self) -> Option<&dyn InputProducer> {
        None
    }

    fn arguments_producer(&self) -> Option<&dyn ArgumentsProducer> {
        None
    }
}

/// Judge-side context available to context-aware checkers
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub tokens: &'a [String],
    pub stdin: &'a [u8],
}

/// Artifacts of one test case handed to a checker
#[derive(Debug, Clone, Copy)]
pub struct MatchRequest<'a> {
    /// Present for context-aware checks, absent for the isolated protocol
    pub context: Option<MatchContext<'a>>,
    pub produced: &'a [u8],
    pub reference: &'a [u8],
}

impl<'a> MatchRequest<'a> {
    pub fn new(produced: &'a [u8], reference: &'a [u8]) -> Self {
        Self {
            context: None,
            produced,
            reference,
        }
    }

    pub fn with_context(mut self, tokens: &'a [String], stdin: &'a [u8]) -> Self {
        self.context = Some(MatchContext { tokens, stdin });
        self
    }
}

/// Decides whether produced output matches the reference
pub trait OutputMatcher {
    fn check(&self, request: &MatchRequest<'_>) -> Result<MatchOutcome, PluginError>;
}

/// Conducts a live exchange with the process under test
pub trait Interactor {
    fn interact(&self, input_data: &[u8], channel: SolutionChannel) -> anyhow::Result<()>;
}
