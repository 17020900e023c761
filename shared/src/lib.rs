//! Shared types for the document numbering workspace
//!
//! Domain types used by the numbering engine and by every document-producing
//! service (invoices, quotes, credit notes, purchase orders), plus the
//! unified error vocabulary.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
pub use models::{
    Counter, Document, DocumentStatus, DocumentType, RejectReason, Scope, ValidationOutcome,
};
