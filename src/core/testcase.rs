//! Test case numbering and artifact naming

use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the file recording how many tests a generation run produced
pub const LEDGER_FILE: &str = ".tests_count";

/// Width of the zero-padded base name
const BASE_NAME_WIDTH: usize = 3;

/// Kinds of per-test artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Input data fed to the solution (`.dat`)
    Input,
    /// Expected answer (`.ans`)
    Answer,
    /// Parameter record (`.inf`)
    Params,
    /// Auxiliary files directory (`.dir`)
    Directory,
}

impl Artifact {
    pub fn extension(self) -> &'static str {
        match self {
            Artifact::Input => "dat",
            Artifact::Answer => "ans",
            Artifact::Params => "inf",
            Artifact::Directory => "dir",
        }
    }
}

/// A single test number (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestCase(u32);

impl TestCase {
    /// Create a test case, rejecting 0
    pub fn new(number: u32) -> Option<Self> {
        (number >= 1).then_some(Self(number))
    }

    pub fn number(self) -> u32 {
        self.0
    }

    /// Zero-padded stem shared by all artifacts of this test ("001", "042", "123")
    pub fn base_name(self) -> String {
        format!("{:0width$}", self.0, width = BASE_NAME_WIDTH)
    }

    /// File name of an artifact, e.g. `007.ans`
    pub fn artifact_name(self, artifact: Artifact) -> String {
        format!("{}.{}", self.base_name(), artifact.extension())
    }

    /// Full path of an artifact inside a working directory
    pub fn artifact_path(self, work_dir: &Path, artifact: Artifact) -> PathBuf {
        work_dir.join(self.artifact_name(artifact))
    }

    /// Iterate test cases `1..=count`
    pub fn all(count: u32) -> impl Iterator<Item = TestCase> {
        (1..=count).map(TestCase)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path of the ledger file inside a working directory
pub fn ledger_path(work_dir: &Path) -> PathBuf {
    work_dir.join(LEDGER_FILE)
}
