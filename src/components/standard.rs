//! Standard checkers built into the harness
//!
//! All of them compare whitespace-separated tokens in order: the token counts
//! must agree and the first differing pair decides the mismatch. Tokens are
//! raw bytes split on ASCII whitespace; only the numeric checkers decode them.

use std::str::FromStr;

use tracing::debug;

use super::{MatchRequest, OutputMatcher};
use crate::core::MatchOutcome;
use crate::plugin::PluginError;

/// Default absolute tolerance of the float checker
pub const DEFAULT_FLOAT_EPSILON: f64 = 1e-6;

/// Checker selectable by name in a problem manifest
#[derive(Debug, Clone, PartialEq)]
pub enum StandardChecker {
    /// Exact token comparison
    Tokens,
    /// Tokens parsed as 64-bit integers
    Integer,
    /// Tokens parsed as floats, equal within `epsilon`
    Float { epsilon: f64 },
}

impl StandardChecker {
    /// Resolve a checker name, `None` if it does not name a standard checker
    pub fn by_name(name: &str, epsilon: f64) -> Option<Self> {
        match name {
            "text" | "tokens" => Some(StandardChecker::Tokens),
            "int" | "long" => Some(StandardChecker::Integer),
            "float" | "double" => Some(StandardChecker::Float { epsilon }),
            _ => None,
        }
    }

    /// Compare two outputs
    pub fn compare(&self, produced: &[u8], reference: &[u8]) -> MatchOutcome {
        let observed = tokenize(produced);
        let expected = tokenize(reference);

        if observed.len() != expected.len() {
            return MatchOutcome::mismatch(format!(
                "Values count mismatch: expected {}, got {}",
                expected.len(),
                observed.len()
            ));
        }

        for (index, (want, got)) in expected.iter().zip(&observed).enumerate() {
            if !self.tokens_equal(want, got) {
                let want = String::from_utf8_lossy(want);
                let got = String::from_utf8_lossy(got);
                debug!("Token {} differs: {:?} vs {:?}", index, want, got);
                return MatchOutcome::mismatch(format!(
                    "Value mismatch at {}: expected {}, got {}",
                    index, want, got
                ));
            }
        }

        MatchOutcome::matched()
    }

    fn tokens_equal(&self, expected: &[u8], observed: &[u8]) -> bool {
        match self {
            StandardChecker::Tokens => expected == observed,
            StandardChecker::Integer => parsed_equal::<i64>(expected, observed, |a, b| a == b),
            StandardChecker::Float { epsilon } => {
                parsed_equal::<f64>(expected, observed, |a, b| (a - b).abs() <= *epsilon)
            }
        }
    }
}

fn tokenize(data: &[u8]) -> Vec<&[u8]> {
    data.split(|&b| b.is_ascii_whitespace() || b == 0x0b)
        .filter(|token| !token.is_empty())
        .collect()
}

fn parse<T: FromStr>(token: &[u8]) -> Option<T> {
    std::str::from_utf8(token).ok()?.parse().ok()
}

/// An unparsable observed token never matches; an unparsable expected token
/// falls back to exact comparison.
fn parsed_equal<T: FromStr>(expected: &[u8], observed: &[u8], eq: impl Fn(T, T) -> bool) -> bool {
    match (parse::<T>(expected), parse::<T>(observed)) {
        (Some(a), Some(b)) => eq(a, b),
        (None, _) => expected == observed,
        (Some(_), None) => false,
    }
}

impl OutputMatcher for StandardChecker {
    fn check(&self, request: &MatchRequest<'_>) -> Result<MatchOutcome, PluginError> {
        Ok(self.compare(request.produced, request.reference))
    }
}
