//! Shared error types across usermetric crates.

use std::fmt;

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Missing key, unparseable query parameter, invalid config value.
    BadInput,
    /// Insert on a key that is already taken.
    Conflict,
    /// Request body could not be decoded.
    MalformedBody,
    /// Store failure.
    Backend,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and tests.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadInput => "BAD_INPUT",
            ClientCode::Conflict => "CONFLICT",
            ClientCode::MalformedBody => "MALFORMED_BODY",
            ClientCode::Backend => "BACKEND",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, UserMetricError>;

/// Unified error type used by core and gateway.
///
/// The `Display` text is what the client sees as the plain-text error body,
/// so the messages are kept stable.
#[derive(Debug, Error)]
pub enum UserMetricError {
    #[error("{0}")]
    BadInput(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    MalformedBody(String),
    #[error(transparent)]
    Backend(#[from] StoreError),
    #[error("internal: {0}")]
    Internal(String),
}

impl UserMetricError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            UserMetricError::BadInput(_) => ClientCode::BadInput,
            UserMetricError::Conflict(_) => ClientCode::Conflict,
            UserMetricError::MalformedBody(_) => ClientCode::MalformedBody,
            UserMetricError::Backend(_) => ClientCode::Backend,
            UserMetricError::Internal(_) => ClientCode::Internal,
        }
    }
}

/// Errors raised by the document store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("datastore: no such entity")]
    NoSuchEntity,
    #[error("datastore: deadline exceeded")]
    DeadlineExceeded,
    #[error("datastore: request cancelled")]
    Cancelled,
    #[error("datastore: over quota")]
    OverQuota,
    #[error("datastore: {0}")]
    Backend(String),
}

impl StoreError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NoSuchEntity => "no_such_entity",
            StoreError::DeadlineExceeded => "deadline_exceeded",
            StoreError::Cancelled => "cancelled",
            StoreError::OverQuota => "over_quota",
            StoreError::Backend(_) => "backend",
        }
    }
}

/// Describes a stored property that could not be loaded into the current shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub kind: String,
    pub field: String,
    pub reason: String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "datastore: cannot load field {:?} into a {:?}: {}",
            self.field, self.kind, self.reason
        )
    }
}

/// Error of a typed read.
///
/// `FieldMismatch` is the schema-drift signal: the stored document decoded only
/// partly, and `decoded` holds everything that could be read.
#[derive(Debug, Error)]
pub enum ReadError<T> {
    #[error("{mismatch}")]
    FieldMismatch { decoded: T, mismatch: FieldMismatch },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a typed read.
pub type ReadResult<T> = std::result::Result<T, ReadError<T>>;

/// Accept partially decoded reads as success.
pub trait TolerateDrift<T> {
    /// Drops a `FieldMismatch` and keeps the decoded value; other errors pass through.
    fn tolerate_drift(self) -> std::result::Result<T, StoreError>;
}

impl<T> TolerateDrift<T> for ReadResult<T> {
    fn tolerate_drift(self) -> std::result::Result<T, StoreError> {
        match self {
            Ok(v) => Ok(v),
            Err(ReadError::FieldMismatch { decoded, mismatch }) => {
                tracing::debug!(%mismatch, "tolerating stored shape drift");
                Ok(decoded)
            }
            Err(ReadError::Store(e)) => Err(e),
        }
    }
}
