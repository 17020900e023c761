//! Document Repository

use crate::error::{NumberingError, NumberingResult};
use shared::models::{Document, DocumentStatus, DocumentType, Scope};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const DOCUMENT_COLUMNS: &str =
    "id, tenant_id, document_type, status, number, prefix, issue_date, created_at, updated_at";

pub async fn insert(conn: &mut SqliteConnection, doc: &Document) -> NumberingResult<()> {
    sqlx::query(
        "INSERT INTO document (id, tenant_id, document_type, status, number, prefix, issue_date, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(doc.id)
    .bind(&doc.tenant_id)
    .bind(doc.document_type.as_str())
    .bind(doc.status.as_str())
    .bind(&doc.number)
    .bind(&doc.prefix)
    .bind(doc.issue_date)
    .bind(doc.created_at)
    .bind(doc.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> NumberingResult<Option<Document>> {
    let row = sqlx::query_as::<_, Document>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM document WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Tenant-scoped lookup; a document of another tenant is reported as missing
pub async fn find_for_tenant(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: i64,
) -> NumberingResult<Document> {
    sqlx::query_as::<_, Document>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM document WHERE id = ? AND tenant_id = ?"
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| NumberingError::NotFound(format!("Document {id}")))
}

pub async fn list(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    document_type: DocumentType,
    year: Option<i32>,
) -> NumberingResult<Vec<Document>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {DOCUMENT_COLUMNS} FROM document WHERE tenant_id = "
    ));
    qb.push_bind(tenant_id);
    qb.push(" AND document_type = ");
    qb.push_bind(document_type.as_str());
    if let Some(year) = year {
        qb.push(" AND substr(issue_date, 1, 4) = ");
        qb.push_bind(format!("{year:04}"));
    }
    qb.push(" ORDER BY issue_date, created_at, id");

    let rows = qb.build_query_as::<Document>().fetch_all(&mut *conn).await?;
    Ok(rows)
}

/// Documents of a scope whose status is in `statuses`.
///
/// The prefix restricts the scan only when non-empty; the year comes from
/// the issue date.
pub async fn find_in_scope(
    conn: &mut SqliteConnection,
    scope: &Scope,
    statuses: &[DocumentStatus],
) -> NumberingResult<Vec<Document>> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let (start, end) = scope.year_bounds()?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {DOCUMENT_COLUMNS} FROM document WHERE tenant_id = "
    ));
    qb.push_bind(&scope.tenant_id);
    qb.push(" AND document_type = ");
    qb.push_bind(scope.document_type.as_str());
    qb.push(" AND issue_date >= ");
    qb.push_bind(start);
    qb.push(" AND issue_date < ");
    qb.push_bind(end);
    if !scope.prefix.is_empty() {
        qb.push(" AND prefix = ");
        qb.push_bind(&scope.prefix);
    }
    qb.push(" AND status IN (");
    let mut separated = qb.separated(", ");
    for status in statuses {
        separated.push_bind(status.as_str());
    }
    separated.push_unseparated(")");
    qb.push(" ORDER BY created_at, id");

    let rows = qb.build_query_as::<Document>().fetch_all(&mut *conn).await?;
    Ok(rows)
}

/// Replace a document's number without touching its status
pub async fn update_number(
    conn: &mut SqliteConnection,
    id: i64,
    number: Option<&str>,
) -> NumberingResult<()> {
    sqlx::query("UPDATE document SET number = ?, updated_at = ? WHERE id = ?")
        .bind(number)
        .bind(shared::util::now_millis())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Give a draft its definitive number and finalized status.
///
/// Guarded on the row still being a draft; a concurrent finalize of the same
/// document turns into a conflict instead of a second number.
pub async fn assign_number_and_status(
    conn: &mut SqliteConnection,
    id: i64,
    number: &str,
    status: DocumentStatus,
) -> NumberingResult<()> {
    let result = sqlx::query(
        "UPDATE document SET number = ?, status = ?, updated_at = ? WHERE id = ? AND status = 'DRAFT'",
    )
    .bind(number)
    .bind(status.as_str())
    .bind(shared::util::now_millis())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(NumberingError::conflict());
    }
    Ok(())
}

/// Move a document back to `DRAFT` under a new draft token
pub async fn demote_to_draft(
    conn: &mut SqliteConnection,
    id: i64,
    token: &str,
) -> NumberingResult<()> {
    sqlx::query("UPDATE document SET number = ?, status = 'DRAFT', updated_at = ? WHERE id = ?")
        .bind(token)
        .bind(shared::util::now_millis())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Change status only if the row is still in `from`; returns whether it changed
pub async fn update_status(
    conn: &mut SqliteConnection,
    id: i64,
    from: DocumentStatus,
    to: DocumentStatus,
) -> NumberingResult<bool> {
    let result =
        sqlx::query("UPDATE document SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(shared::util::now_millis())
            .bind(id)
            .bind(from.as_str())
            .execute(&mut *conn)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(conn: &mut SqliteConnection, tenant_id: &str, id: i64) -> NumberingResult<bool> {
    let result = sqlx::query("DELETE FROM document WHERE id = ? AND tenant_id = ?")
        .bind(id)
        .bind(tenant_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
