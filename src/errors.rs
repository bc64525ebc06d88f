use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in `andgrep`.
///
/// Configuration problems (`Config`) are fatal and abort the run before any
/// file is touched. Everything that goes wrong while handling one file is
/// wrapped in `Processing` so the walker can report it and move on.
#[derive(Error, Debug)]
pub enum Error {
    /// An error related to file system I/O.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An invalid invocation: bad patterns, bad extension list, bad mode combination.
    #[error("{0}")]
    Config(String),

    /// An error that occurred during the processing of a single file.
    #[error("{path}: {source}")]
    Processing {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An error from the `ignore` crate, which is used for directory traversal.
    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// An error that occurred while building the highlighting matcher.
    #[error("Pattern compilation failed: {0}")]
    Regex(#[from] regex::Error),

    /// An error related to persisting a temporary file over the original.
    #[error("Tempfile error: {0}")]
    TempFile(#[from] tempfile::PersistError),

    /// An error related to CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An error related to JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wraps any error raised while handling `path` into a per-file error.
    pub fn processing<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Processing {
            path: path.into(),
            source: source.into(),
        }
    }

    /// `true` for errors that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Processing { .. })
    }
}

/// A convenient type alias for `Result<T, andgrep::errors::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Config(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Config(s.to_string())
    }
}
