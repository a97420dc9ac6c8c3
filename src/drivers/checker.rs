//! Checker drivers
//!
//! Two protocols judge one test case:
//! - context-aware: files named on the command line, the plugin sees the
//!   test's argument tokens and stdin next to both outputs
//! - isolated: both outputs arrive concatenated on stdin, their lengths on the
//!   command line, and failures are reported per load stage
//!
//! A plain file check (`match(observed, reference)` over two files) shares
//! the context-aware failure handling.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::read_optional;
use crate::components::{MatchRequest, OutputMatcher};
use crate::core::{params, CheckOutcome};
use crate::plugin::script::ScriptChecker;
use crate::plugin::PluginError;

/// Files a context-aware check reads
#[derive(Debug, Clone)]
pub struct CheckFiles {
    pub module: PathBuf,
    pub work_dir: PathBuf,
    /// Argument tokens, `.inf` record or legacy plain form; may be absent
    pub arguments: PathBuf,
    /// Input the solution was fed; may be absent
    pub stdin: PathBuf,
    /// What the solution produced; required
    pub output: PathBuf,
    /// Reference answer; may be absent
    pub answer: PathBuf,
}

/// Run a matcher and fold plugin errors into the outcome
pub fn evaluate(matcher: &dyn OutputMatcher, request: &MatchRequest<'_>) -> CheckOutcome {
    match matcher.check(request) {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            warn!("Checker failed at {} stage: {}", e.stage(), e);
            CheckOutcome::failed(e.stage(), e.to_string())
        }
    }
}

fn failed_load(e: PluginError) -> CheckOutcome {
    warn!("Checker failed to load: {}", e);
    CheckOutcome::failed(e.stage(), e.to_string())
}

/// Context-aware check.
///
/// An `Err` means the driver itself could not run (the produced output is
/// unreadable); plugin failures are reported inside the outcome.
pub fn check_with_context(files: &CheckFiles) -> Result<CheckOutcome> {
    let checker = match ScriptChecker::load(&files.module, &files.work_dir) {
        Ok(checker) => checker,
        Err(e) => return Ok(failed_load(e)),
    };

    let produced = fs::read(&files.output)
        .with_context(|| format!("Failed to read produced output {:?}", files.output))?;
    let reference = read_optional(&files.answer)?;
    let stdin = read_optional(&files.stdin)?;
    let tokens = params::decode_file(&files.arguments)
        .with_context(|| format!("Failed to read arguments {:?}", files.arguments))?;
    debug!(
        "Checking {} produced bytes against {} reference bytes with {} argument(s)",
        produced.len(),
        reference.len(),
        tokens.len()
    );

    let request = MatchRequest::new(&produced, &reference).with_context(&tokens, &stdin);
    Ok(evaluate(&checker, &request))
}

/// Plain file check; both files are required
pub fn check_files(
    module: &Path,
    work_dir: &Path,
    observed_file: &Path,
    reference_file: &Path,
) -> Result<CheckOutcome> {
    let checker = match ScriptChecker::load(module, work_dir) {
        Ok(checker) => checker,
        Err(e) => return Ok(failed_load(e)),
    };

    let observed = fs::read(observed_file)
        .with_context(|| format!("Failed to read observed output {:?}", observed_file))?;
    let reference = fs::read(reference_file)
        .with_context(|| format!("Failed to read reference {:?}", reference_file))?;

    Ok(evaluate(&checker, &MatchRequest::new(&observed, &reference)))
}

/// Isolated check: reads `observed_len` then `standard_len` bytes from
/// `payload`. A short payload yields shorter strings, not an error.
pub fn check_isolated(
    observed_len: usize,
    standard_len: usize,
    module: &Path,
    work_dir: &Path,
    payload: &mut dyn Read,
) -> Result<CheckOutcome> {
    let observed = read_prefix(payload, observed_len).context("Failed to read observed output")?;
    let standard = read_prefix(payload, standard_len).context("Failed to read standard output")?;

    let checker = match ScriptChecker::load(module, work_dir) {
        Ok(checker) => checker,
        Err(e) => return Ok(failed_load(e)),
    };

    let request = MatchRequest::new(&observed, &standard);
    Ok(evaluate(&checker, &request))
}

/// Up to `len` bytes; the declared length is not trusted for allocation
fn read_prefix(reader: &mut dyn Read, len: usize) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader
        .take(u64::try_from(len).unwrap_or(u64::MAX))
        .read_to_end(&mut data)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{exit_codes, CheckMode, FailureStage};
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    const SQUARES_CHECKER: &str = r#"
def match(tokens, stdin, produced, reference):
    got = produced.split()
    want = reference.split()
    if len(got) != len(want):
        print("Values count mismatch: expected %d, got %d" % (len(want), len(got)))
        return False
    for i in range(len(want)):
        if got[i] != want[i]:
            print("Value mismatch at %d: expected %s, got %s" % (i, want[i], got[i]))
            return False
    return True
"#;

    fn problem(checker: &str) -> (TempDir, CheckFiles) {
        let dir = tempdir().unwrap();
        let module = dir.path().join("checker.star");
        fs::write(&module, checker).unwrap();
        fs::write(dir.path().join("001.dat"), "5 -3 10").unwrap();
        fs::write(dir.path().join("001.ans"), "25 9 100").unwrap();
        let files = CheckFiles {
            module,
            work_dir: dir.path().to_path_buf(),
            arguments: dir.path().join("001.inf"),
            stdin: dir.path().join("001.dat"),
            output: dir.path().join("001.out"),
            answer: dir.path().join("001.ans"),
        };
        (dir, files)
    }

    #[test]
    fn test_context_aware_match() {
        let (_dir, files) = problem(SQUARES_CHECKER);
        fs::write(&files.output, "25 9 100\n").unwrap();

        let outcome = check_with_context(&files).unwrap();
        assert_eq!(outcome, CheckOutcome::Matched { diagnostic: None });
        assert_eq!(outcome.exit_code(CheckMode::ContextAware), exit_codes::MATCH);
    }

    #[test]
    fn test_context_aware_mismatch_diagnostic() {
        let (_dir, files) = problem(SQUARES_CHECKER);
        fs::write(&files.output, "25 9 101").unwrap();

        let outcome = check_with_context(&files).unwrap();
        assert_eq!(
            outcome.diagnostic(),
            Some("Value mismatch at 2: expected 100, got 101")
        );
        assert_eq!(outcome.exit_code(CheckMode::ContextAware), exit_codes::MISMATCH);
    }

    #[test]
    fn test_context_aware_sees_tokens_and_stdin() {
        let (dir, files) = problem(
            r#"
def match(tokens, stdin, produced, reference):
    return tokens == ["--mode", "strict"] and stdin == "5 -3 10" and reference == ""
"#,
        );
        fs::write(dir.path().join("001.inf"), "params = --mode strict\n").unwrap();
        fs::remove_file(&files.answer).unwrap();
        fs::write(&files.output, "").unwrap();

        assert!(matches!(
            check_with_context(&files).unwrap(),
            CheckOutcome::Matched { .. }
        ));
    }

    #[test]
    fn test_context_aware_missing_output_is_abnormal() {
        let (_dir, files) = problem(SQUARES_CHECKER);
        assert!(check_with_context(&files).is_err());
    }

    #[test]
    fn test_context_aware_raise_is_failure() {
        let (_dir, files) = problem("def match(t, s, p, r):\n    fail(\"checker bug\")\n");
        fs::write(&files.output, "1").unwrap();

        let outcome = check_with_context(&files).unwrap();
        assert!(outcome.diagnostic().unwrap().contains("checker bug"));
        assert_eq!(outcome.exit_code(CheckMode::ContextAware), exit_codes::ABNORMAL);
    }

    fn isolated(checker: &str, observed: &str, standard: &str) -> CheckOutcome {
        let dir = tempdir().unwrap();
        let module = dir.path().join("checker.star");
        fs::write(&module, checker).unwrap();
        let mut payload = Cursor::new(format!("{}{}", observed, standard).into_bytes());
        check_isolated(
            observed.len(),
            standard.len(),
            &module,
            dir.path(),
            &mut payload,
        )
        .unwrap()
    }

    #[test]
    fn test_isolated_split_by_lengths() {
        let checker = "def match(observed, standard):\n    return observed == \"ab\" and standard == \"cde\"\n";
        let outcome = isolated(checker, "ab", "cde");
        assert_eq!(outcome.exit_code(CheckMode::Isolated), exit_codes::MATCH);

        let outcome = isolated(checker, "abc", "de");
        assert_eq!(outcome.exit_code(CheckMode::Isolated), exit_codes::MISMATCH);
    }

    #[test]
    fn test_isolated_stage_exit_codes() {
        let cases = [
            ("def match(a, b)\n", FailureStage::Load, exit_codes::LOAD_FAILED),
            ("load(\"x.star\", \"y\")\n", FailureStage::Instantiate, exit_codes::INSTANTIATE_FAILED),
            ("fail(\"top\")\n", FailureStage::Initialize, exit_codes::INIT_FAILED),
            ("def match(a, b):\n    fail(\"inside\")\n", FailureStage::Invoke, exit_codes::MATCH_FAILED),
            ("x = 1\n", FailureStage::Invoke, exit_codes::MATCH_FAILED),
        ];
        for (source, stage, code) in cases {
            let outcome = isolated(source, "a", "b");
            assert!(
                matches!(outcome, CheckOutcome::Failed { stage: s, .. } if s == stage),
                "{:?} for {:?}",
                outcome,
                source
            );
            assert_eq!(outcome.exit_code(CheckMode::Isolated), code);
        }
    }

    #[test]
    fn test_plain_file_check() {
        let (dir, files) = problem("def match(observed, reference):\n    return observed.split() == reference.split()\n");
        fs::write(&files.output, "25 9 100\n").unwrap();

        let outcome = check_files(&files.module, dir.path(), &files.output, &files.answer).unwrap();
        assert_eq!(outcome.exit_code(CheckMode::ContextAware), exit_codes::MATCH);

        fs::write(&files.output, "25 9 101\n").unwrap();
        let outcome = check_files(&files.module, dir.path(), &files.output, &files.answer).unwrap();
        assert_eq!(outcome.exit_code(CheckMode::ContextAware), exit_codes::MISMATCH);

        let missing = dir.path().join("absent.ans");
        assert!(check_files(&files.module, dir.path(), &files.output, &missing).is_err());
    }

    #[test]
    fn test_isolated_compares_bytes_exactly() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("checker.star");
        fs::write(&module, "def match(observed, standard):\n    return observed == standard\n").unwrap();

        let mut payload = Cursor::new(vec![0xff, 0xfe]);
        let outcome = check_isolated(1, 1, &module, dir.path(), &mut payload).unwrap();
        assert_eq!(outcome.exit_code(CheckMode::Isolated), exit_codes::MISMATCH);

        let mut payload = Cursor::new(vec![0xff, 0xff]);
        let outcome = check_isolated(1, 1, &module, dir.path(), &mut payload).unwrap();
        assert_eq!(outcome.exit_code(CheckMode::Isolated), exit_codes::MATCH);
    }

    #[test]
    fn test_isolated_huge_declared_length() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("checker.star");
        fs::write(&module, "def match(a, b):\n    return a == \"ab\" and b == \"\"\n").unwrap();

        let mut payload = Cursor::new(b"ab".to_vec());
        let outcome = check_isolated(usize::MAX, 0, &module, dir.path(), &mut payload).unwrap();
        assert!(matches!(outcome, CheckOutcome::Matched { .. }));

        let mut payload = Cursor::new(b"ab".to_vec());
        let outcome = check_isolated(1 << 40, 1 << 40, &module, dir.path(), &mut payload).unwrap();
        assert!(matches!(outcome, CheckOutcome::Matched { .. }));
    }

    #[test]
    fn test_context_aware_stdin_is_byte_exact() {
        let (dir, files) = problem(
            "def match(tokens, stdin, produced, reference):\n    return stdin == chr(255) + chr(0) + chr(128)\n",
        );
        fs::write(dir.path().join("001.dat"), [0xffu8, 0x00, 0x80]).unwrap();
        fs::write(&files.output, "").unwrap();
        assert!(matches!(
            check_with_context(&files).unwrap(),
            CheckOutcome::Matched { .. }
        ));

        fs::write(dir.path().join("001.dat"), [0xfeu8, 0x00, 0x80]).unwrap();
        assert!(matches!(
            check_with_context(&files).unwrap(),
            CheckOutcome::Mismatched { .. }
        ));
    }

    #[test]
    fn test_isolated_short_payload() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("checker.star");
        fs::write(&module, "def match(a, b):\n    return a == \"xy\" and b == \"\"\n").unwrap();
        let mut payload = Cursor::new(b"xy".to_vec());

        let outcome = check_isolated(5, 5, &module, dir.path(), &mut payload).unwrap();
        assert!(matches!(outcome, CheckOutcome::Matched { .. }));
    }
}
