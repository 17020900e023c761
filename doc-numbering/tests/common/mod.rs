//! Shared setup for integration tests: a file database in a temp dir

#![allow(dead_code)]

use chrono::NaiveDate;
use doc_numbering::{Config, DocumentService, RetryPolicy};
use shared::models::{DocumentStatus, DocumentType, NewDocument};
use tempfile::TempDir;

pub const TENANT: &str = "tenant-a";

pub struct TestEnv {
    // Held so the database file outlives the test
    _dir: TempDir,
    pub service: DocumentService,
}

pub async fn setup() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_path: dir.path().join("numbering.db").to_string_lossy().into_owned(),
        db_max_connections: 8,
        db_busy_timeout_ms: 10_000,
        retry: RetryPolicy::new(20, 1, 50),
        environment: "test".into(),
    };
    let engine = doc_numbering::connect(&config).await.unwrap();
    TestEnv {
        _dir: dir,
        service: DocumentService::new(engine),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn new_document(
    document_type: DocumentType,
    status: DocumentStatus,
    prefix: &str,
    issue_date: NaiveDate,
) -> NewDocument {
    NewDocument {
        tenant_id: TENANT.into(),
        document_type,
        status,
        prefix: Some(prefix.into()),
        issue_date,
        manual_number: None,
    }
}

pub fn invoice(status: DocumentStatus) -> NewDocument {
    new_document(DocumentType::Invoice, status, "F-202501", date(2025, 1, 15))
}
