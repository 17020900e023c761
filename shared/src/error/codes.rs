//! Unified error codes for document numbering
//!
//! This module defines all error codes surfaced by the numbering engine and the
//! document services built on it. Error codes are organized by category:
//! - 0xxx: General errors
//! - 3xxx: Tenant errors
//! - 4xxx: Document and numbering errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,

    // ==================== 3xxx: Tenant ====================
    /// Tenant not selected
    TenantNotSelected = 3001,
    /// Tenant not found
    TenantNotFound = 3002,

    // ==================== 4xxx: Document ====================
    /// Document not found
    DocumentNotFound = 4001,
    /// Document is not a draft
    DocumentNotDraft = 4002,
    /// Unknown document type
    DocumentTypeUnknown = 4003,
    /// Status does not belong to the document type
    StatusNotAllowed = 4004,
    /// Status transition is not permitted
    StatusTransitionInvalid = 4005,
    /// Document does not belong to the numbering scope
    ScopeMismatch = 4006,

    // ==================== 41xx: Numbering ====================
    /// Number already used in the scope
    NumberAlreadyUsed = 4101,
    /// Number does not continue the sequence
    NumberNotNext = 4102,
    /// Number would leave a gap in the sequence
    NumberWouldCreateGap = 4103,
    /// Number is not a positive integer
    NumberInvalid = 4104,
    /// Scope has reached the largest representable number
    SequenceExhausted = 4105,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// System busy (concurrent writers, retry later)
    SystemBusy = 9404,
    /// Storage unreachable
    StorageUnavailable = 9405,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether the client may retry the same request unchanged
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::SystemBusy | ErrorCode::StorageUnavailable | ErrorCode::TimeoutError
        )
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",

            // Tenant
            ErrorCode::TenantNotSelected => "No tenant selected",
            ErrorCode::TenantNotFound => "Tenant not found",

            // Document
            ErrorCode::DocumentNotFound => "Document not found",
            ErrorCode::DocumentNotDraft => "Document is not a draft",
            ErrorCode::DocumentTypeUnknown => "Unknown document type",
            ErrorCode::StatusNotAllowed => "Status is not valid for this document type",
            ErrorCode::StatusTransitionInvalid => "Status transition is not permitted",
            ErrorCode::ScopeMismatch => "Document does not belong to this numbering scope",

            // Numbering
            ErrorCode::NumberAlreadyUsed => "Number is already used",
            ErrorCode::NumberNotNext => "Number must continue the sequence",
            ErrorCode::NumberWouldCreateGap => "Number would leave a gap in the sequence",
            ErrorCode::NumberInvalid => "Number must be a positive integer",
            ErrorCode::SequenceExhausted => "Numbering sequence is exhausted",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::SystemBusy => "System busy, please retry later",
            ErrorCode::StorageUnavailable => "Storage unavailable, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),

            // Tenant
            3001 => Ok(ErrorCode::TenantNotSelected),
            3002 => Ok(ErrorCode::TenantNotFound),

            // Document
            4001 => Ok(ErrorCode::DocumentNotFound),
            4002 => Ok(ErrorCode::DocumentNotDraft),
            4003 => Ok(ErrorCode::DocumentTypeUnknown),
            4004 => Ok(ErrorCode::StatusNotAllowed),
            4005 => Ok(ErrorCode::StatusTransitionInvalid),
            4006 => Ok(ErrorCode::ScopeMismatch),

            // Numbering
            4101 => Ok(ErrorCode::NumberAlreadyUsed),
            4102 => Ok(ErrorCode::NumberNotNext),
            4103 => Ok(ErrorCode::NumberWouldCreateGap),
            4104 => Ok(ErrorCode::NumberInvalid),
            4105 => Ok(ErrorCode::SequenceExhausted),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9404 => Ok(ErrorCode::SystemBusy),
            9405 => Ok(ErrorCode::StorageUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
