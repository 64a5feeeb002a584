use std::fmt;

use thiserror::Error;

use crate::model::PlaceKey;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    LockError(String),
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use StorageError::*;
        match self {
            Io(e) => Some(e as &dyn std::error::Error),
            Json(e) => Some(e as &dyn std::error::Error),
            _ => None,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use StorageError::*;
        match self {
            Io(e) => write!(f, "IoError: {}", e),
            Json(e) => write!(f, "JsonError: {}", e),
            LockError(s) => write!(f, "LockError: {}", s),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Io(error)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Json(error)
    }
}

/// Why the sync controller declined to start an add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardReason {
    AlreadyFavorited,
    AddInFlight,
}

impl fmt::Display for GuardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardReason::AlreadyFavorited => write!(f, "place is already favorited"),
            GuardReason::AddInFlight => write!(f, "another favorite is being added"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("already a favorite: {0}")]
    Duplicate(PlaceKey),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("skipped: {0}")]
    Guard(GuardReason),

    #[error("{0}")]
    Auth(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Validation and guard errors are handled locally and never shown as blocking.
    pub fn is_local(&self) -> bool {
        matches!(self, ClientError::Validation(_) | ClientError::Guard(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::Network(error)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn storage_error_keeps_its_source() {
        let err = StorageError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert_eq!(crate::unpack_error(&err), "IoError: gone: gone");
    }

    #[test]
    fn only_validation_and_guard_are_local() {
        assert!(ClientError::Guard(GuardReason::AddInFlight).is_local());
        assert!(ClientError::Validation("missing".into()).is_local());
        assert!(!ClientError::Auth("bad password".into()).is_local());
        assert!(
            !ClientError::Server {
                status: 500,
                message: "boom".into()
            }
            .is_local()
        );
    }
}
