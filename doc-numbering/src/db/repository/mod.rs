//! Repository Module
//!
//! Free functions over an explicit `&mut SqliteConnection`, so the caller
//! decides the transaction boundary.

pub mod counter;
pub mod document;
