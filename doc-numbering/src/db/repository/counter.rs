//! Counter Repository
//!
//! One `numbering_counter` row per scope. Every write is a single statement,
//! so it is atomic on its own; callers run them inside the write transaction
//! opened by [`acquire_write_lock`].

use crate::error::NumberingResult;
use shared::models::{Counter, Scope};
use sqlx::SqliteConnection;

const COUNTER_COLUMNS: &str = "document_type, prefix, tenant_id, year, last_number, updated_at";

/// Take the database write lock for the current transaction.
///
/// Must be the first statement of every numbering transaction: SQLite waits
/// (busy_timeout) for a free write lock, but fails immediately when a
/// transaction that already read tries to upgrade to a write.
pub async fn acquire_write_lock(conn: &mut SqliteConnection) -> NumberingResult<()> {
    sqlx::query("UPDATE numbering_lock SET touched_at = ? WHERE id = 1")
        .bind(shared::util::now_millis())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn find(conn: &mut SqliteConnection, scope: &Scope) -> NumberingResult<Option<Counter>> {
    let row = sqlx::query_as::<_, Counter>(&format!(
        "SELECT {COUNTER_COLUMNS} FROM numbering_counter WHERE document_type = ? AND prefix = ? AND tenant_id = ? AND year = ?"
    ))
    .bind(scope.document_type.as_str())
    .bind(&scope.prefix)
    .bind(&scope.tenant_id)
    .bind(scope.year)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn find_all(conn: &mut SqliteConnection) -> NumberingResult<Vec<Counter>> {
    let rows = sqlx::query_as::<_, Counter>(&format!(
        "SELECT {COUNTER_COLUMNS} FROM numbering_counter ORDER BY tenant_id, document_type, year, prefix"
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Create the counter at 1, or add exactly 1; returns the new `last_number`
pub async fn upsert_increment(conn: &mut SqliteConnection, scope: &Scope) -> NumberingResult<i64> {
    let value: i64 = sqlx::query_scalar(
        "INSERT INTO numbering_counter (document_type, prefix, tenant_id, year, last_number, updated_at) VALUES (?1, ?2, ?3, ?4, 1, ?5) \
         ON CONFLICT (document_type, prefix, tenant_id, year) DO UPDATE SET last_number = numbering_counter.last_number + 1, updated_at = excluded.updated_at \
         RETURNING last_number",
    )
    .bind(scope.document_type.as_str())
    .bind(&scope.prefix)
    .bind(&scope.tenant_id)
    .bind(scope.year)
    .bind(shared::util::now_millis())
    .fetch_one(&mut *conn)
    .await?;
    Ok(value)
}

/// Lower the counter to `target` only when it is currently above it.
///
/// Returns whether a row was changed.
pub async fn set_if_underflow(
    conn: &mut SqliteConnection,
    scope: &Scope,
    target: i64,
) -> NumberingResult<bool> {
    let result = sqlx::query(
        "UPDATE numbering_counter SET last_number = ?1, updated_at = ?2 WHERE document_type = ?3 AND prefix = ?4 AND tenant_id = ?5 AND year = ?6 AND last_number > ?1",
    )
    .bind(target)
    .bind(shared::util::now_millis())
    .bind(scope.document_type.as_str())
    .bind(&scope.prefix)
    .bind(&scope.tenant_id)
    .bind(scope.year)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Move the counter from `expected` to `new`; false when someone else moved it first
pub async fn compare_and_set(
    conn: &mut SqliteConnection,
    scope: &Scope,
    expected: i64,
    new: i64,
) -> NumberingResult<bool> {
    let result = sqlx::query(
        "UPDATE numbering_counter SET last_number = ?1, updated_at = ?2 WHERE document_type = ?3 AND prefix = ?4 AND tenant_id = ?5 AND year = ?6 AND last_number = ?7",
    )
    .bind(new)
    .bind(shared::util::now_millis())
    .bind(scope.document_type.as_str())
    .bind(&scope.prefix)
    .bind(&scope.tenant_id)
    .bind(scope.year)
    .bind(expected)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Raise the counter to at least `value` (creating it if needed); never lowers it
pub async fn raise_to(conn: &mut SqliteConnection, scope: &Scope, value: i64) -> NumberingResult<i64> {
    let value: i64 = sqlx::query_scalar(
        "INSERT INTO numbering_counter (document_type, prefix, tenant_id, year, last_number, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT (document_type, prefix, tenant_id, year) DO UPDATE SET last_number = MAX(numbering_counter.last_number, excluded.last_number), updated_at = excluded.updated_at \
         RETURNING last_number",
    )
    .bind(scope.document_type.as_str())
    .bind(&scope.prefix)
    .bind(&scope.tenant_id)
    .bind(scope.year)
    .bind(value)
    .bind(shared::util::now_millis())
    .fetch_one(&mut *conn)
    .await?;
    Ok(value)
}

/// Set the counter to exactly `value` (administrative reconciliation)
pub async fn force_set(conn: &mut SqliteConnection, scope: &Scope, value: i64) -> NumberingResult<()> {
    sqlx::query(
        "INSERT INTO numbering_counter (document_type, prefix, tenant_id, year, last_number, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT (document_type, prefix, tenant_id, year) DO UPDATE SET last_number = excluded.last_number, updated_at = excluded.updated_at",
    )
    .bind(scope.document_type.as_str())
    .bind(&scope.prefix)
    .bind(&scope.tenant_id)
    .bind(scope.year)
    .bind(value)
    .bind(shared::util::now_millis())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
