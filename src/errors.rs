use thiserror::Error;

/// The primary error type for all operations in the `blobswap` application.
///
/// This enum uses `thiserror` to neatly wrap the various kinds of errors that
/// can occur, from I/O issues to malformed marker configuration. Failures that
/// only affect a single swap pair (a stale payload, a failed numeric
/// transform) are not represented here; they are accumulated into the run
/// report instead and never abort the run.
#[derive(Error, Debug)]
pub enum Error {
    /// An error related to file system I/O.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error that occurred while parsing a YAML configuration file.
    #[error("Config parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A general configuration-related error.
    #[error("Config error: {0}")]
    Config(String),

    /// A hexadecimal string that could not be decoded into bytes.
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    /// A numeric payload transform exceeded the representable value range.
    #[error("Numeric overflow: {0}")]
    Overflow(String),

    /// A payload write whose length does not match the existing record gap.
    #[error("Payload width mismatch: expected {expected} bytes, got {actual}")]
    PayloadWidthMismatch { expected: usize, actual: usize },

    /// An error from the `ignore` crate, which is used for directory traversal.
    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// An error from the `walkdir` crate, used by the cleanup stage.
    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// An error that occurred while building the Rayon thread pool.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// An error related to persisting a temporary file.
    #[error("Tempfile error: {0}")]
    TempFile(#[from] tempfile::PersistError),

    /// An error related to CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An error related to JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error that occurred converting a byte slice to a UTF-8 string.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A convenient type alias for `Result<T, blobswap::errors::Error>`.
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
