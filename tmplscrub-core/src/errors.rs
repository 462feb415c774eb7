//! errors.rs - Custom error and warning types for the tmplscrub-core library.
//!
//! Errors are per-file or per-run failures. Warnings are recorded on the file's
//! report and never stop processing.
//!
//! License: MIT OR APACHE 2.0

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// This enum represents all possible error types in the `tmplscrub-core` library.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScrubError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' is not valid UTF-8", path.display())]
    InvalidUtf8 { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Escape rule '{rule}' produces output that rule '{other}' would match again")]
    RuleConflict { rule: String, other: String },

    #[error("Site build did not finish within {}s", timeout.as_secs())]
    VerifierTimeout { timeout: Duration },

    #[error("Site build failed ({status}): {stderr_tail}")]
    VerifierBuild { status: String, stderr_tail: String },
}

impl ScrubError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScrubError::Io { path: path.into(), source }
    }
}

/// Non-fatal conditions found while processing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScrubWarning {
    /// The document ends inside a code block. `line` is the 1-based line of the
    /// opening fence; everything after it was treated as code.
    UnterminatedFence { line: usize },
}

impl std::fmt::Display for ScrubWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrubWarning::UnterminatedFence { line } => {
                write!(f, "unterminated code fence opened at line {}", line)
            }
        }
    }
}
