use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classes reported by storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageErrorKind {
    Unauthorized,
    NotFound,
    Throttled,
    Transient,
    Malformed,
}

impl StorageErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageErrorKind::Throttled | StorageErrorKind::Transient)
    }
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageErrorKind::Unauthorized => "Unauthorized",
            StorageErrorKind::NotFound => "NotFound",
            StorageErrorKind::Throttled => "Throttled",
            StorageErrorKind::Transient => "Transient",
            StorageErrorKind::Malformed => "Malformed",
        };
        write!(f, "{name}")
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    #[error("enumeration failed: {0}")]
    EnumerationError(String),
    #[error("filter failed: {0}")]
    FilterError(String),
    #[error("dispatch failed: {0}")]
    DispatchError(String),
    #[error("transient transfer error({kind}): {message}")]
    TransientTransferError {
        kind: StorageErrorKind,
        message: String,
    },
    #[error("terminal transfer error({kind}): {message}")]
    TerminalTransferError {
        kind: StorageErrorKind,
        message: String,
    },
    #[error("scheduler has been shut down before all jobs finished.")]
    SchedulerShutdownError,
    #[error("a object references a parent directory.")]
    DirectoryTraversalError,
}

/// Classifies an error coming out of a storage call.
///
/// Typed `StorageError`s keep their kind. Plain `io::Error`s are mapped by `io::ErrorKind`,
/// anything else is treated as transient.
pub fn classify_error(e: &anyhow::Error) -> StorageErrorKind {
    if let Some(storage_error) = e.downcast_ref::<StorageError>() {
        return storage_error.kind;
    }

    if let Some(TransferError::DirectoryTraversalError) = e.downcast_ref::<TransferError>() {
        return StorageErrorKind::Malformed;
    }

    if let Some(io_error) = e.downcast_ref::<io::Error>() {
        return classify_io_error_kind(io_error.kind());
    }

    for cause in e.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return classify_io_error_kind(io_error.kind());
        }
    }

    StorageErrorKind::Transient
}

fn classify_io_error_kind(kind: io::ErrorKind) -> StorageErrorKind {
    match kind {
        io::ErrorKind::NotFound => StorageErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => StorageErrorKind::Unauthorized,
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            StorageErrorKind::Malformed
        }
        _ => StorageErrorKind::Transient,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, anyhow};

    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(StorageErrorKind::Throttled.is_retryable());
        assert!(StorageErrorKind::Transient.is_retryable());

        assert!(!StorageErrorKind::Unauthorized.is_retryable());
        assert!(!StorageErrorKind::NotFound.is_retryable());
        assert!(!StorageErrorKind::Malformed.is_retryable());
    }

    #[test]
    fn classify_storage_error() {
        let e = anyhow!(StorageError::new(StorageErrorKind::Throttled, "slow down"));
        assert_eq!(classify_error(&e), StorageErrorKind::Throttled);
        assert_eq!(e.to_string(), "Throttled: slow down");
    }

    #[test]
    fn classify_io_error() {
        let e = anyhow!(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(classify_error(&e), StorageErrorKind::NotFound);

        let e = anyhow!(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(classify_error(&e), StorageErrorKind::Unauthorized);

        let e = anyhow!(io::Error::from(io::ErrorKind::ConnectionReset));
        assert_eq!(classify_error(&e), StorageErrorKind::Transient);
    }

    #[test]
    fn classify_wrapped_io_error() {
        let result: Result<(), io::Error> = Err(io::Error::from(io::ErrorKind::NotFound));
        let e = result.context("open failed.").unwrap_err();
        assert_eq!(classify_error(&e), StorageErrorKind::NotFound);
    }

    #[test]
    fn classify_unknown_error() {
        let e = anyhow!("unknown");
        assert_eq!(classify_error(&e), StorageErrorKind::Transient);

        let e = anyhow!(TransferError::DirectoryTraversalError);
        assert_eq!(classify_error(&e), StorageErrorKind::Malformed);
    }
}
