//! Reconciliation Scanner
//!
//! Reads the numbers actually held by finalized documents of a scope. The
//! counter row can drift from this (deleted documents, imports, numbers
//! written without the engine); the scan is what the allocator trusts.

use crate::db::repository::document;
use crate::error::NumberingResult;
use shared::models::{Document, DocumentStatus, Scope};
use sqlx::SqliteConnection;
use std::collections::BTreeSet;

/// Finalized documents of the scope (any number format)
pub async fn finalized_documents(
    conn: &mut SqliteConnection,
    scope: &Scope,
) -> NumberingResult<Vec<Document>> {
    document::find_in_scope(conn, scope, scope.document_type.finalized_statuses()).await
}

/// Draft documents of the scope
pub async fn draft_documents(
    conn: &mut SqliteConnection,
    scope: &Scope,
) -> NumberingResult<Vec<Document>> {
    document::find_in_scope(conn, scope, &[DocumentStatus::Draft]).await
}

/// Numeric values held by finalized documents; draft tokens and free text are skipped
pub fn sequence_numbers(docs: &[Document]) -> BTreeSet<i64> {
    docs.iter().filter_map(Document::sequence_number).collect()
}

/// Highest numeric value in `docs`, 0 when there is none
pub fn max_number(docs: &[Document]) -> i64 {
    docs.iter()
        .filter_map(Document::sequence_number)
        .max()
        .unwrap_or(0)
}

/// `maxAssignedNumber(scope)`: highest finalized number, 0 for an empty scope
pub async fn max_assigned_number(conn: &mut SqliteConnection, scope: &Scope) -> NumberingResult<i64> {
    let docs = finalized_documents(conn, scope).await?;
    Ok(max_number(&docs))
}

/// Finalized document holding sequence value `n`, other than `exclude_id`
pub async fn occupant_of(
    conn: &mut SqliteConnection,
    scope: &Scope,
    n: i64,
    exclude_id: Option<i64>,
) -> NumberingResult<Option<Document>> {
    let docs = finalized_documents(conn, scope).await?;
    Ok(docs
        .into_iter()
        .find(|d| d.sequence_number() == Some(n) && Some(d.id) != exclude_id))
}
