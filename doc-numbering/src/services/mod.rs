//! Service layer
//!
//! - [`DocumentService`]: documents numbered through the engine

pub mod document_service;

pub use document_service::DocumentService;
