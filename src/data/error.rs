//! Storage error taxonomy
//!
//! Raw storage engine failures are folded into four classes. Only a
//! permission failure disables the feature; everything else degrades to
//! "no snapshot this time".

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Storage permission denied: {0}")]
    PermissionDenied(String),
    #[error("Stored snapshot is corrupted: {0}")]
    Corrupted(String),
    #[error("Storage error: {0}")]
    Unknown(String),
}

impl StorageError {
    /// Permission failures disable the feature for the session
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, StorageError::PermissionDenied(_))
    }

    /// Stable label used in logs and observability payloads
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::QuotaExceeded(_) => "quota-exceeded",
            StorageError::PermissionDenied(_) => "permission-denied",
            StorageError::Corrupted(_) => "corrupted",
            StorageError::Unknown(_) => "unknown",
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                ErrorCode::DiskFull | ErrorCode::TooBig => StorageError::QuotaExceeded(message),
                ErrorCode::ReadOnly
                | ErrorCode::PermissionDenied
                | ErrorCode::AuthorizationForStatementDenied
                | ErrorCode::CannotOpen => StorageError::PermissionDenied(message),
                ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                    StorageError::Corrupted(message)
                }
                _ => StorageError::Unknown(message),
            },
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::Utf8Error(_) => StorageError::Corrupted(message),
            _ => StorageError::Unknown(message),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Corrupted(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(err.to_string()),
            _ => StorageError::Unknown(err.to_string()),
        }
    }
}
