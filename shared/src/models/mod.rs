//! Data models
//!
//! Shared between the numbering engine and the document services.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All row IDs are snowflake `i64` values.

pub mod document;
pub mod numbering;

// Re-exports
pub use document::*;
pub use numbering::*;
