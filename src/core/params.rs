//! Parameter file (`.inf`) codec
//!
//! Current form is a single `params = <tokens>` line. Files without the `.inf`
//! extension are read in the legacy form: bare space-separated tokens.
//! Tokens cannot contain spaces; there is no escaping.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

/// The only key ever produced or recognized
const PARAMS_KEY: &str = "params";

/// Extension that selects the `key = value` form
const PARAMS_EXTENSION: &str = "inf";

/// Decode a parameter file into its token sequence.
///
/// A missing file, a record without `=`, or an unknown key all decode to an
/// empty sequence.
pub fn decode_file(path: &Path) -> io::Result<Vec<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Parameter file {:?} is absent, using no tokens", path);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let keyed = path
        .extension()
        .is_some_and(|ext| ext == PARAMS_EXTENSION);

    Ok(if keyed {
        decode_record(&content)
    } else {
        split_tokens(content.trim())
    })
}

/// Decode the `key = value` record form
pub fn decode_record(content: &str) -> Vec<String> {
    let Some((key, value)) = content.trim().split_once('=') else {
        return Vec::new();
    };
    if key.trim() != PARAMS_KEY {
        debug!("Ignoring parameter record with unknown key {:?}", key.trim());
        return Vec::new();
    }
    split_tokens(value.trim())
}

/// Render the record line for a token sequence, `None` when there is nothing to write
pub fn encode_record(tokens: &[String]) -> Option<String> {
    if tokens.is_empty() {
        return None;
    }
    Some(format!("{} = {}\n", PARAMS_KEY, tokens.join(" ")))
}

/// Write a parameter file. Returns `false` (and creates nothing) for an empty sequence.
pub fn encode_file(path: &Path, tokens: &[String]) -> io::Result<bool> {
    match encode_record(tokens) {
        Some(line) => {
            fs::write(path, line)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn split_tokens(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(' ').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encode_then_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("001.inf");

        assert!(encode_file(&path, &tokens(&["--n", "5"])).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "params = --n 5\n");
        assert_eq!(decode_file(&path).unwrap(), tokens(&["--n", "5"]));
    }

    #[test]
    fn test_empty_tokens_write_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("001.inf");

        assert!(!encode_file(&path, &[]).unwrap());
        assert!(!path.exists());
        assert!(decode_file(&path).unwrap().is_empty());
    }

    #[test]
    fn test_legacy_form() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("args.txt");
        fs::write(&path, "a b c\n").unwrap();

        assert_eq!(decode_file(&path).unwrap(), tokens(&["a", "b", "c"]));
    }

    #[test]
    fn test_malformed_records_are_empty() {
        assert!(decode_record("no separator here").is_empty());
        assert!(decode_record("other = x y").is_empty());
        assert!(decode_record("params =").is_empty());
        assert!(decode_record("").is_empty());
    }

    #[test]
    fn test_record_splits_on_first_equals() {
        assert_eq!(
            decode_record("  params =  --opt=1 b  \n"),
            tokens(&["--opt=1", "b"])
        );
    }
}
