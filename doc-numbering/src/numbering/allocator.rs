//! Sequence Allocator
//!
//! Reconcile the counter against the scan, then advance it atomically. The
//! atomic increment is the only place a number is handed out; the
//! reconciliation around it only moves the starting point to match what the
//! documents table actually holds.
//!
//! Must run inside a numbering transaction (write lock held).

use super::scanner;
use crate::db::repository::counter;
use crate::error::{NumberingError, NumberingResult};
use shared::models::Scope;
use sqlx::SqliteConnection;

/// Next definitive sequence value for the scope
pub async fn next_number(conn: &mut SqliteConnection, scope: &Scope) -> NumberingResult<i64> {
    // 1. what the documents say
    let existing_max = scanner::max_assigned_number(conn, scope).await?;
    let following = successor(scope, existing_max)?;

    // 2-3. a counter above reality is lowered back to it
    if let Some(current) = counter::find(conn, scope).await?
        && current.last_number > existing_max
        && counter::set_if_underflow(conn, scope, existing_max).await?
    {
        tracing::warn!(
            tenant_id = %scope.tenant_id,
            document_type = %scope.document_type,
            prefix = %scope.prefix,
            year = scope.year,
            counter = current.last_number,
            existing_max,
            "Counter ahead of finalized documents, lowered"
        );
    }

    // 4. atomic advance
    let candidate = counter::upsert_increment(conn, scope).await?;

    // 5. a counter below reality (first use on an imported scope, or left
    //    behind by a manual number) jumps past the highest finalized number
    let number = if candidate <= existing_max {
        let target = following;
        if !counter::compare_and_set(conn, scope, candidate, target).await? {
            return Err(NumberingError::conflict());
        }
        tracing::warn!(
            tenant_id = %scope.tenant_id,
            document_type = %scope.document_type,
            prefix = %scope.prefix,
            year = scope.year,
            candidate,
            existing_max,
            "Counter behind finalized documents, raised"
        );
        target
    } else {
        candidate
    };

    tracing::debug!(
        tenant_id = %scope.tenant_id,
        document_type = %scope.document_type,
        prefix = %scope.prefix,
        year = scope.year,
        number,
        "Sequence number allocated"
    );
    Ok(number)
}

/// Read-only projection of the next number: `existingMax + 1`
pub async fn peek_next(conn: &mut SqliteConnection, scope: &Scope) -> NumberingResult<i64> {
    let existing_max = scanner::max_assigned_number(conn, scope).await?;
    successor(scope, existing_max)
}

/// `n + 1`, or `SequenceExhausted` when the scope already holds the largest value
fn successor(scope: &Scope, n: i64) -> NumberingResult<i64> {
    n.checked_add(1)
        .ok_or_else(|| NumberingError::SequenceExhausted(scope.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::test_util::{date, document, insert_all};
    use shared::models::{DocumentStatus, DocumentType};

    fn scope() -> Scope {
        Scope::new(DocumentType::Invoice, "F", "tenant-a", 2025)
    }

    fn finalized(number: &str) -> shared::models::Document {
        document(
            DocumentType::Invoice,
            DocumentStatus::Pending,
            Some(number),
            "F",
            date(2025, 3, 3),
        )
    }

    #[tokio::test]
    async fn numbers_advance_as_documents_take_them() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        assert_eq!(next_number(&mut conn, &scope()).await.unwrap(), 1);
        insert_all(&mut conn, &[finalized("0001")]).await;
        assert_eq!(next_number(&mut conn, &scope()).await.unwrap(), 2);
        insert_all(&mut conn, &[finalized("0002")]).await;
        assert_eq!(next_number(&mut conn, &scope()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn largest_value_exhausts_the_scope() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        insert_all(&mut conn, &[finalized(&i64::MAX.to_string())]).await;

        let err = next_number(&mut conn, &scope()).await.unwrap_err();
        assert!(matches!(err, NumberingError::SequenceExhausted(_)));
        assert!(matches!(
            peek_next(&mut conn, &scope()).await.unwrap_err(),
            NumberingError::SequenceExhausted(_)
        ));
        // Nothing was written on the way out
        assert!(counter::find(&mut conn, &scope()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn imported_documents_without_counter() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        insert_all(&mut conn, &[finalized("0001"), finalized("0002"), finalized("0003")]).await;

        assert_eq!(next_number(&mut conn, &scope()).await.unwrap(), 4);
        let counter = counter::find(&mut conn, &scope()).await.unwrap().unwrap();
        assert_eq!(counter.last_number, 4);
    }

    #[tokio::test]
    async fn counter_ahead_of_documents_is_lowered() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        insert_all(&mut conn, &[finalized("0001"), finalized("0002")]).await;
        counter::force_set(&mut conn, &scope(), 9).await.unwrap();

        assert_eq!(next_number(&mut conn, &scope()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn counter_behind_documents_is_raised() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        insert_all(&mut conn, &[finalized("0005")]).await;
        counter::force_set(&mut conn, &scope(), 2).await.unwrap();

        assert_eq!(next_number(&mut conn, &scope()).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn peek_does_not_touch_counter() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        insert_all(&mut conn, &[finalized("0001")]).await;

        assert_eq!(peek_next(&mut conn, &scope()).await.unwrap(), 2);
        assert_eq!(peek_next(&mut conn, &scope()).await.unwrap(), 2);
        assert!(counter::find(&mut conn, &scope()).await.unwrap().is_none());
    }
}
