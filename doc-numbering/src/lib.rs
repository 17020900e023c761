//! doc-numbering - sequential document numbering engine
//!
//! Gap-free, per-tenant, per-document-type numbers for invoices, quotes,
//! credit notes and purchase orders under concurrent writers, plus the
//! draft lifecycle that lets a draft claim its definitive number later.
//!
//! # Module layout
//!
//! ```text
//! doc-numbering/src/
//! ├── config.rs      # environment configuration
//! ├── error.rs       # NumberingError and its AppError mapping
//! ├── db/            # SQLite pool, migrations, repositories
//! ├── numbering/     # scanner, allocator, drafts, validator, engine
//! └── services/      # DocumentService collaborator
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod numbering;
pub mod services;

#[cfg(test)]
mod test_util;

// Re-export public types
pub use config::Config;
pub use db::DbService;
pub use error::{NumberingError, NumberingResult};
pub use numbering::{
    DraftNumberRequest, FinalizeRequest, NumberingEngine, ReconcileReport, RetryPolicy,
};
pub use services::DocumentService;

/// Open the configured database and build an engine on it
pub async fn connect(config: &Config) -> NumberingResult<NumberingEngine> {
    let db = DbService::new(config).await?;
    Ok(NumberingEngine::new(db, config.retry))
}
