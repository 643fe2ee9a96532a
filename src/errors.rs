use thiserror::Error;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum AutoloaderError {
    #[error("Date parsing error: '{input}': {reason}")]
    ParseError { input: String, reason: String },

    #[error("Invalid date range: start {start} must precede end {end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("HTTP request error for {ticker}: {source}")]
    TransportError {
        ticker: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for {ticker}")]
    HttpStatus { ticker: String, status: u16 },

    #[error("IO error on {}: {source}", .path.display())]
    FilesystemError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", .path.display())]
    RecordError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("No ticker records available to merge")]
    NoRecords,
}

impl AutoloaderError {
    /// Ticker the error belongs to, if it came from a single fetch.
    pub fn ticker(&self) -> Option<&str> {
        match self {
            AutoloaderError::TransportError { ticker, .. }
            | AutoloaderError::HttpStatus { ticker, .. } => Some(ticker.as_str()),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AutoloaderError::FilesystemError { path: path.into(), source }
    }

    /// I/O failures inside the CSV layer are filesystem errors; the rest is malformed content.
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        if !source.is_io_error() {
            return AutoloaderError::RecordError { path: path.into(), source };
        }
        match source.into_kind() {
            csv::ErrorKind::Io(err) => Self::io(path, err),
            other => Self::io(path, std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", other))),
        }
    }
}

pub type Result<T> = std::result::Result<T, AutoloaderError>;
