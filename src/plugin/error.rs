//! Error types for plugin loading and invocation.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::FailureStage;

/// Errors from loading a plugin module or calling one of its capabilities.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Module file is missing or cannot be read.
    #[error("cannot read plugin {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Module source does not parse.
    #[error("syntax error in plugin {path:?}: {message}")]
    Syntax { path: PathBuf, message: String },

    /// Parsed module cannot be bound to a plugin environment.
    #[error("cannot instantiate plugin {path:?}: {message}")]
    Instantiate { path: PathBuf, message: String },

    /// Top-level code of the module raised.
    #[error("plugin {path:?} failed during initialization: {message}")]
    Initialization { path: PathBuf, message: String },

    /// A capability raised when invoked.
    #[error("{capability}() failed: {message}")]
    Execution { capability: String, message: String },

    /// A required capability is not defined by the module.
    #[error("plugin does not define required function {capability}()")]
    MissingCapability { capability: String },

    /// A capability returned a value of the wrong type.
    #[error("{capability}() must return {expected}, got {got}")]
    BadReturn {
        capability: String,
        expected: String,
        got: String,
    },
}

impl PluginError {
    /// Stage of the plugin lifecycle the error belongs to
    pub fn stage(&self) -> FailureStage {
        match self {
            PluginError::Unreadable { .. } | PluginError::Syntax { .. } => FailureStage::Load,
            PluginError::Instantiate { .. } => FailureStage::Instantiate,
            PluginError::Initialization { .. } => FailureStage::Initialize,
            PluginError::Execution { .. }
            | PluginError::MissingCapability { .. }
            | PluginError::BadReturn { .. } => FailureStage::Invoke,
        }
    }

    pub(crate) fn bad_return(capability: &str, expected: &str, got: impl Into<String>) -> Self {
        PluginError::BadReturn {
            capability: capability.to_string(),
            expected: expected.to_string(),
            got: got.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages() {
        let err = PluginError::Unreadable {
            path: PathBuf::from("checker.star"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.stage(), FailureStage::Load);

        let err = PluginError::Initialization {
            path: PathBuf::from("checker.star"),
            message: "fail: broken".to_string(),
        };
        assert_eq!(err.stage(), FailureStage::Initialize);
        assert!(err.to_string().contains("fail: broken"));

        let err = PluginError::bad_return("get_tests_count", "int", "string");
        assert_eq!(err.stage(), FailureStage::Invoke);
        assert_eq!(
            err.to_string(),
            "get_tests_count() must return int, got string"
        );
    }
}
