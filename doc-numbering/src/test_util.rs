//! Fixtures shared by the unit tests

use crate::db::repository::document as document_repo;
use chrono::NaiveDate;
use shared::models::{Document, DocumentStatus, DocumentType};
use sqlx::SqliteConnection;
use std::sync::atomic::{AtomicI64, Ordering};

static NEXT_ID: AtomicI64 = AtomicI64::new(1);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Document of `tenant-a` with a unique id
pub fn document(
    document_type: DocumentType,
    status: DocumentStatus,
    number: Option<&str>,
    prefix: &str,
    issue_date: NaiveDate,
) -> Document {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    Document {
        id,
        tenant_id: "tenant-a".into(),
        document_type,
        status,
        number: number.map(str::to_string),
        prefix: prefix.into(),
        issue_date,
        created_at: id,
        updated_at: id,
    }
}

pub async fn insert_all(conn: &mut SqliteConnection, docs: &[Document]) {
    for doc in docs {
        document_repo::insert(conn, doc).await.unwrap();
    }
}

pub async fn number_of(conn: &mut SqliteConnection, id: i64) -> Option<String> {
    document_repo::find_by_id(conn, id)
        .await
        .unwrap()
        .and_then(|d| d.number)
}
