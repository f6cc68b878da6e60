use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `EpisimError` and maps to other errors to
/// convert to an `EpisimError`
///
/// Every variant is fatal for the run that produced it: the plan loop stops at
/// the first error and the partially processed day is discarded.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EpisimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// Incomplete scenario setup, e.g. an activity with no infection parameters.
    ConfigError(String),
    /// Registry bookkeeping or event ordering is inconsistent.
    InvariantViolation(String),
    ReportError(String),
    EpisimError(String),
}

impl From<io::Error> for EpisimError {
    fn from(error: io::Error) -> Self {
        EpisimError::IoError(error)
    }
}

impl From<serde_json::Error> for EpisimError {
    fn from(error: serde_json::Error) -> Self {
        EpisimError::JsonError(error)
    }
}

impl From<csv::Error> for EpisimError {
    fn from(error: csv::Error) -> Self {
        EpisimError::CsvError(error)
    }
}

impl From<String> for EpisimError {
    fn from(error: String) -> Self {
        EpisimError::EpisimError(error)
    }
}

impl From<&str> for EpisimError {
    fn from(error: &str) -> Self {
        EpisimError::EpisimError(error.to_string())
    }
}

impl std::error::Error for EpisimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpisimError::IoError(error) => Some(error),
            EpisimError::JsonError(error) => Some(error),
            EpisimError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for EpisimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpisimError::IoError(error) => write!(f, "I/O error: {error}"),
            EpisimError::JsonError(error) => write!(f, "JSON error: {error}"),
            EpisimError::CsvError(error) => write!(f, "CSV error: {error}"),
            EpisimError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            EpisimError::InvariantViolation(msg) => write!(f, "Invariant violation: {msg}"),
            EpisimError::ReportError(msg) => write!(f, "Report error: {msg}"),
            EpisimError::EpisimError(msg) => write!(f, "Error: {msg}"),
        }
    }
}
