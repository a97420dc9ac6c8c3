//! Drivers - one-shot processes that run a single plugin
//!
//! Each driver performs exactly one unit of work:
//! - `generator`: produce the artifact set of a problem's test suite
//! - `checker`: judge one test case (context-aware or isolated protocol)
//! - `interactor`: run one live session against the process under test
//!
//! Drivers do NOT:
//! - Enforce time or memory limits (the sandbox does)
//! - Decide which tests to run or retry anything
//! - Change the process working directory; it is passed to the plugin instead

pub mod checker;
pub mod generator;
pub mod interactor;

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a file that may legitimately be absent, absent reads as empty
pub(crate) fn read_optional(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_optional() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("001.dat");
        assert!(read_optional(&path).unwrap().is_empty());

        fs::write(&path, b"5 -3 10").unwrap();
        assert_eq!(read_optional(&path).unwrap(), b"5 -3 10".to_vec());
    }
}
