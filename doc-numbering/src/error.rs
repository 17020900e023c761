//! Numbering error type
//!
//! `NumberingError` is what every repository, engine and service function
//! returns. `From<NumberingError> for AppError` is the boundary to the API
//! layers of the document services: manual-number rejections keep their
//! reason, infrastructure failures collapse into a generic "try again".

use shared::error::{AppError, ErrorCode};
use shared::models::{DocumentStatus, DocumentType, RejectReason, ScopeError};
use sqlx::error::DatabaseError;
use thiserror::Error;

/// SQLite result codes that mean "another writer got there first"
const SQLITE_CONFLICT_CODES: &[&str] = &[
    "5",   // SQLITE_BUSY
    "6",   // SQLITE_LOCKED
    "261", // SQLITE_BUSY_RECOVERY
    "262", // SQLITE_LOCKED_SHAREDCACHE
    "517", // SQLITE_BUSY_SNAPSHOT
];

#[derive(Debug, Error)]
pub enum NumberingError {
    /// A race was detected; retried internally until the budget runs out
    #[error("Concurrent numbering conflict after {attempts} attempt(s)")]
    ConcurrencyConflict { attempts: u32 },

    #[error("Invalid manual number: {0}")]
    InvalidManualNumber(RejectReason),

    /// Programmer error: missing tenant, unknown type, document outside scope
    #[error("Cannot resolve numbering scope: {0}")]
    ScopeResolution(String),

    #[error("Numbering storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Document {0} is not a draft")]
    NotDraft(i64),

    #[error("Status {status} is not valid for {document_type}")]
    StatusNotAllowed {
        document_type: DocumentType,
        status: DocumentStatus,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The scope already holds the largest representable number
    #[error("Numbering sequence exhausted for {0}")]
    SequenceExhausted(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl NumberingError {
    pub fn conflict() -> Self {
        Self::ConcurrencyConflict { attempts: 1 }
    }

    /// Whether the whole unit of work may be re-run
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

fn is_write_conflict(err: &dyn DatabaseError) -> bool {
    err.is_unique_violation()
        || err
            .code()
            .is_some_and(|code| SQLITE_CONFLICT_CODES.iter().any(|c| code == *c))
}

impl From<sqlx::Error> for NumberingError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if is_write_conflict(db.as_ref()) => Self::conflict(),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_) => Self::StorageUnavailable(err.to_string()),
            sqlx::Error::RowNotFound => Self::NotFound(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for NumberingError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(format!("Failed to apply migrations: {err}"))
    }
}

impl From<ScopeError> for NumberingError {
    fn from(err: ScopeError) -> Self {
        Self::ScopeResolution(err.to_string())
    }
}

impl From<NumberingError> for AppError {
    fn from(err: NumberingError) -> Self {
        match err {
            NumberingError::InvalidManualNumber(reason) => {
                let (code, expected) = match reason {
                    RejectReason::NotANumber | RejectReason::OutOfRange => {
                        (ErrorCode::NumberInvalid, None)
                    }
                    RejectReason::AlreadyUsed => (ErrorCode::NumberAlreadyUsed, None),
                    RejectReason::NotNextInSequence { expected } => {
                        (ErrorCode::NumberNotNext, Some(expected))
                    }
                    RejectReason::WouldCreateGap { expected } => {
                        (ErrorCode::NumberWouldCreateGap, Some(expected))
                    }
                };
                let app = AppError::with_message(code, reason.to_string());
                match expected {
                    Some(n) => app.with_detail("expected", shared::models::pad_number(n)),
                    None => app,
                }
            }
            NumberingError::NotFound(msg) => {
                AppError::with_message(ErrorCode::DocumentNotFound, msg)
            }
            NumberingError::NotDraft(id) => {
                AppError::new(ErrorCode::DocumentNotDraft).with_detail("document_id", id)
            }
            NumberingError::StatusNotAllowed {
                document_type,
                status,
            } => AppError::new(ErrorCode::StatusNotAllowed)
                .with_detail("document_type", document_type.as_str())
                .with_detail("status", status.as_str()),
            NumberingError::InvalidState(msg) => {
                AppError::with_message(ErrorCode::StatusTransitionInvalid, msg)
            }
            NumberingError::SequenceExhausted(scope) => {
                tracing::error!(scope = %scope, "Numbering sequence exhausted");
                AppError::new(ErrorCode::SequenceExhausted).with_detail("scope", scope)
            }
            NumberingError::ScopeResolution(msg) => {
                tracing::error!(error = %msg, "Numbering scope could not be resolved");
                AppError::with_message(ErrorCode::InvalidRequest, msg)
            }
            NumberingError::ConcurrencyConflict { attempts } => {
                tracing::warn!(attempts, "Numbering retries exhausted");
                AppError::busy()
            }
            NumberingError::StorageUnavailable(msg) => {
                tracing::error!(error = %msg, "Numbering storage unavailable");
                AppError::new(ErrorCode::StorageUnavailable)
            }
            NumberingError::Database(msg) => {
                tracing::error!(error = %msg, "Numbering database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

/// Convenience type alias for numbering results
pub type NumberingResult<T> = Result<T, NumberingError>;
