use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from the account directory (the manager HTTP bridge or its
/// in-memory stand-in). A failed call for one login never fails a scan
/// pass; callers downgrade these to warnings and an empty result.
#[derive(Debug, Error, Clone)]
pub enum DirectoryError {
    #[error("bridge request failed: {0}")]
    Request(String),

    #[error("bridge returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode bridge payload: {0}")]
    Decode(String),

    #[error("bridge call timed out")]
    Timeout,

    #[error("unknown login: {0}")]
    UnknownLogin(String),
}

impl From<reqwest::Error> for DirectoryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DirectoryError::Timeout
        } else if e.is_decode() {
            DirectoryError::Decode(e.to_string())
        } else {
            DirectoryError::Request(e.to_string())
        }
    }
}

/// Errors that abort a whole scan pass, as opposed to a single login.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("account enumeration failed: {0}")]
    Enumeration(#[source] DirectoryError),

    #[error("scanner control channel closed: {0}")]
    ControlChannel(String),
}

impl<T> From<mpsc::error::SendError<T>> for ScanError {
    fn from(e: mpsc::error::SendError<T>) -> Self {
        ScanError::ControlChannel(e.to_string())
    }
}
