//! Fatal configuration errors.
//!
//! Anything in here aborts the whole run. Per-region and per-probe failures
//! are absorbed where they happen and never show up as a [`ConfigError`].

use std::fmt;

/// Configuration problems detected before or during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No provider was selected.
    MissingProvider,
    /// The provider tag does not name a known schema.
    UnsupportedProvider(String),
    /// The output format is neither `txt` nor `csv`.
    UnsupportedFormat(String),
    /// A required external program could not be found.
    MissingTool(String),
    /// The probe concurrency limit was zero.
    InvalidConcurrency,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingProvider => {
                write!(f, "no provider selected (expected one of google, aws, azure)")
            }
            ConfigError::UnsupportedProvider(tag) => {
                write!(
                    f,
                    "unsupported provider '{tag}' (expected one of google, aws, azure)"
                )
            }
            ConfigError::UnsupportedFormat(format) => {
                write!(f, "unsupported output format '{format}' (expected txt or csv)")
            }
            ConfigError::MissingTool(tool) => {
                write!(f, "required program '{tool}' was not found in PATH")
            }
            ConfigError::InvalidConcurrency => {
                write!(f, "concurrency must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
