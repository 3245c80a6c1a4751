use std::fmt;

use thiserror::Error;

use crate::validate::ValidationReport;

/// Coarse classification of every failure the core can produce.
///
/// Transport layers map on the kind, never on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    ValidationFailed,
    Unauthorized,
    Forbidden,
    Conflict,
    Quota,
    Expired,
    Storage,
    Cancelled,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    LockConflict,
    NotFound,
    Constraint,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            StorageErrorKind::LockConflict => "lock conflict",
            StorageErrorKind::NotFound => "not found",
            StorageErrorKind::Constraint => "constraint violation",
            StorageErrorKind::Unknown => "unknown",
        };
        write!(f, "{kind}: {}", self.message)
    }
}

impl std::error::Error for StorageError {}

/// Driver messages that mean another transaction holds the lock we asked for.
const LOCK_CONFLICT_MESSAGES: [&str; 3] = [
    "database is locked",
    "could not obtain lock",
    "Lock wait timeout",
];

pub(crate) fn is_lock_conflict_message(message: &str) -> bool {
    LOCK_CONFLICT_MESSAGES
        .iter()
        .any(|needle| message.contains(needle))
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        let kind = match &err {
            rusqlite::Error::QueryReturnedNoRows => StorageErrorKind::NotFound,
            rusqlite::Error::SqliteFailure(e, _) => match e.code {
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    StorageErrorKind::LockConflict
                }
                rusqlite::ErrorCode::ConstraintViolation => StorageErrorKind::Constraint,
                _ if is_lock_conflict_message(&message) => StorageErrorKind::LockConflict,
                _ => StorageErrorKind::Unknown,
            },
            _ if is_lock_conflict_message(&message) => StorageErrorKind::LockConflict,
            _ => StorageErrorKind::Unknown,
        };
        Self { kind, message }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error ({0})")]
    Storage(#[from] StorageError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("user not found")]
    UserNotFound,

    #[error("role not found: {0}")]
    RoleNotFound(String),

    #[error("token not found")]
    TokenNotFound,

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user is inactive")]
    UserInactive,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("a publish is already in progress for this project")]
    PublishInProgress,

    #[error("nothing to publish")]
    NothingToPublish,

    #[error("source is already used by another redirect")]
    SourceAlreadyUsed,

    #[error("path is already used by another page")]
    PathAlreadyUsed,

    #[error("content size {size} exceeds the limit of {limit} bytes")]
    ContentSizeExceeded { size: i64, limit: i64 },

    #[error("total content size limit of {limit} bytes reached")]
    TotalSizeLimitReached { limit: i64 },

    #[error("import file error: {0}")]
    ImportFile(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Storage(e) if e.kind == StorageErrorKind::NotFound => ErrorKind::NotFound,
            Error::Storage(_) => ErrorKind::Storage,
            Error::NotFound(_)
            | Error::UserNotFound
            | Error::RoleNotFound(_)
            | Error::TokenNotFound => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::InvalidArgument(_) | Error::ImportFile(_) | Error::NothingToPublish => {
                ErrorKind::InvalidArgument
            }
            Error::Validation(_) => ErrorKind::ValidationFailed,
            Error::InvalidCredentials
            | Error::UserInactive
            | Error::InvalidToken
            | Error::Unauthorized => ErrorKind::Unauthorized,
            Error::TokenExpired => ErrorKind::Expired,
            Error::Forbidden => ErrorKind::Forbidden,
            Error::PublishInProgress | Error::SourceAlreadyUsed | Error::PathAlreadyUsed => {
                ErrorKind::Conflict
            }
            Error::ContentSizeExceeded { .. } | Error::TotalSizeLimitReached { .. } => {
                ErrorKind::Quota
            }
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Io(_) | Error::Config(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the underlying storage reported lock contention.
    #[must_use]
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, Error::Storage(e) if e.kind == StorageErrorKind::LockConflict)
    }

    /// True when the underlying storage reported a uniqueness/foreign key violation.
    #[must_use]
    pub fn is_constraint(&self) -> bool {
        matches!(self, Error::Storage(e) if e.kind == StorageErrorKind::Constraint)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(StorageError::from(err))
    }
}

impl From<ValidationReport> for Error {
    fn from(report: ValidationReport) -> Self {
        Error::Validation(report)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_messages_are_detected() {
        assert!(is_lock_conflict_message("database is locked"));
        assert!(is_lock_conflict_message(
            "ERROR: could not obtain lock on row in relation \"projects\""
        ));
        assert!(is_lock_conflict_message(
            "Error 1205: Lock wait timeout exceeded; try restarting transaction"
        ));
        assert!(!is_lock_conflict_message("no such table: projects"));
    }

    #[test]
    fn test_no_rows_maps_to_storage_not_found() {
        let err = Error::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_lock_conflict());
    }

    #[test]
    fn test_conflict_kinds() {
        assert_eq!(Error::PublishInProgress.kind(), ErrorKind::Conflict);
        assert_eq!(Error::SourceAlreadyUsed.kind(), ErrorKind::Conflict);
        assert_eq!(
            Error::TotalSizeLimitReached { limit: 10 }.kind(),
            ErrorKind::Quota
        );
        assert_eq!(Error::TokenExpired.kind(), ErrorKind::Expired);
    }
}
