//! Document Service
//!
//! Generic collaborator shared by the invoice, quote, credit note and
//! purchase order services. Numbering and the document row are always
//! written in the same engine transaction.

use crate::db::repository::document as document_repo;
use crate::error::{NumberingError, NumberingResult};
use crate::numbering::{DraftNumberRequest, FinalizeRequest, NumberingEngine, drafts, validator};
use chrono::Datelike;
use shared::models::{
    Document, DocumentStatus, DocumentType, FinalizeDocument, NewDocument, Scope, pad_number,
    parse_sequence_number,
};
use sqlx::SqliteConnection;

/// Document service (create, finalize, status changes, reads)
#[derive(Clone)]
pub struct DocumentService {
    engine: NumberingEngine,
}

impl DocumentService {
    pub fn new(engine: NumberingEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &NumberingEngine {
        &self.engine
    }

    /// Create a draft (draft token) or a finalized document (definitive number)
    pub async fn create(&self, data: NewDocument) -> NumberingResult<Document> {
        if !data.document_type.allows(data.status) {
            return Err(NumberingError::StatusNotAllowed {
                document_type: data.document_type,
                status: data.status,
            });
        }
        let scope = Scope::resolve(
            data.document_type,
            data.prefix.as_deref(),
            &data.tenant_id,
            data.issue_date,
        )?;

        let doc = self
            .engine
            .transaction("create_document", |conn| {
                let data = data.clone();
                let scope = scope.clone();
                Box::pin(async move { create_in(conn, data, scope).await })
            })
            .await?;

        tracing::info!(
            tenant_id = %doc.tenant_id,
            document_type = %doc.document_type,
            document_id = doc.id,
            status = %doc.status,
            number = doc.number.as_deref().unwrap_or_default(),
            "Document created"
        );
        Ok(doc)
    }

    /// Move a draft to a finalized status, giving it its definitive number
    pub async fn finalize(&self, data: FinalizeDocument) -> NumberingResult<Document> {
        self.engine
            .transaction("finalize_document", |conn| {
                let data = data.clone();
                Box::pin(async move { finalize_in(conn, data).await })
            })
            .await
    }

    /// Change status. Drafts are finalized; finalized documents keep their number.
    pub async fn update_status(
        &self,
        tenant_id: &str,
        id: i64,
        status: DocumentStatus,
    ) -> NumberingResult<Document> {
        self.engine
            .transaction("update_document_status", |conn| {
                let tenant_id = tenant_id.to_string();
                Box::pin(async move { update_status_in(conn, tenant_id, id, status).await })
            })
            .await
    }

    /// Hard delete; the slot of a deleted finalized document is repaired by reconciliation
    pub async fn delete(&self, tenant_id: &str, id: i64) -> NumberingResult<()> {
        let deleted = self
            .engine
            .transaction("delete_document", |conn| {
                let tenant_id = tenant_id.to_string();
                Box::pin(async move { document_repo::delete(conn, &tenant_id, id).await })
            })
            .await?;
        if !deleted {
            return Err(NumberingError::NotFound(format!("Document {id}")));
        }
        tracing::info!(tenant_id = %tenant_id, document_id = id, "Document deleted");
        Ok(())
    }

    pub async fn get(&self, tenant_id: &str, id: i64) -> NumberingResult<Document> {
        let mut conn = self.engine.db().pool.acquire().await?;
        document_repo::find_for_tenant(&mut conn, tenant_id, id).await
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        document_type: DocumentType,
        year: Option<i32>,
    ) -> NumberingResult<Vec<Document>> {
        let mut conn = self.engine.db().pool.acquire().await?;
        document_repo::list(&mut conn, tenant_id, document_type, year).await
    }
}

/// Scope a stored document numbers in (prefix already expanded)
pub fn scope_of(doc: &Document) -> Scope {
    Scope::new(
        doc.document_type,
        doc.prefix.clone(),
        doc.tenant_id.clone(),
        doc.issue_date.year(),
    )
}

/// Reject a manual number that does not continue the sequence; returns it padded
async fn checked_manual_number(
    conn: &mut SqliteConnection,
    scope: &Scope,
    manual: Option<&str>,
) -> NumberingResult<Option<String>> {
    let Some(manual) = manual.map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(None);
    };
    let outcome = validator::validate(conn, scope, manual, false).await?;
    if let Some(reason) = outcome.reason {
        return Err(NumberingError::InvalidManualNumber(reason));
    }
    Ok(parse_sequence_number(manual).map(pad_number))
}

async fn create_in(
    conn: &mut SqliteConnection,
    data: NewDocument,
    scope: Scope,
) -> NumberingResult<Document> {
    let now = shared::util::now_millis();
    let mut doc = Document {
        id: shared::util::snowflake_id(),
        tenant_id: data.tenant_id,
        document_type: data.document_type,
        status: DocumentStatus::Draft,
        number: None,
        prefix: scope.prefix.clone(),
        issue_date: data.issue_date,
        created_at: now,
        updated_at: now,
    };

    if data.status.is_draft() {
        let req = DraftNumberRequest {
            scope,
            manual_number: data.manual_number,
        };
        doc.number = Some(drafts::allocate_draft_number(conn, &req).await?);
        document_repo::insert(conn, &doc).await?;
        return Ok(doc);
    }

    // Finalized on creation: insert as a bare draft, then finalize in place
    let manual_number = checked_manual_number(conn, &scope, data.manual_number.as_deref()).await?;
    document_repo::insert(conn, &doc).await?;
    let req = FinalizeRequest {
        scope,
        document_id: doc.id,
        current_draft_token: None,
        target_status: data.status,
        manual_number,
        original_draft_number: None,
    };
    doc.number = Some(drafts::finalize_number(conn, &req).await?);
    doc.status = data.status;
    Ok(doc)
}

async fn finalize_in(conn: &mut SqliteConnection, data: FinalizeDocument) -> NumberingResult<Document> {
    let doc = document_repo::find_for_tenant(conn, &data.tenant_id, data.document_id).await?;
    if !doc.status.is_draft() {
        return Err(NumberingError::NotDraft(doc.id));
    }
    let scope = scope_of(&doc);
    let manual_number = checked_manual_number(conn, &scope, data.manual_number.as_deref()).await?;

    let req = FinalizeRequest {
        scope,
        document_id: doc.id,
        current_draft_token: doc.number.clone(),
        target_status: data.target_status,
        manual_number,
        original_draft_number: data.original_draft_number,
    };
    drafts::finalize_number(conn, &req).await?;
    document_repo::find_for_tenant(conn, &data.tenant_id, doc.id).await
}

async fn update_status_in(
    conn: &mut SqliteConnection,
    tenant_id: String,
    id: i64,
    status: DocumentStatus,
) -> NumberingResult<Document> {
    let doc = document_repo::find_for_tenant(conn, &tenant_id, id).await?;
    if !doc.document_type.allows(status) {
        return Err(NumberingError::StatusNotAllowed {
            document_type: doc.document_type,
            status,
        });
    }
    if doc.status == status {
        return Ok(doc);
    }

    if doc.status.is_draft() {
        let req = FinalizeRequest {
            scope: scope_of(&doc),
            document_id: doc.id,
            current_draft_token: doc.number.clone(),
            target_status: status,
            manual_number: None,
            original_draft_number: None,
        };
        drafts::finalize_number(conn, &req).await?;
    } else if doc.status.is_terminal() {
        return Err(NumberingError::InvalidState(format!(
            "{} {} is {} and cannot change status",
            doc.document_type.label(),
            doc.id,
            doc.status
        )));
    } else if status.is_draft() {
        return Err(NumberingError::InvalidState(format!(
            "{} {} is numbered and cannot return to {}",
            doc.document_type.label(),
            doc.id,
            status
        )));
    } else if !document_repo::update_status(conn, doc.id, doc.status, status).await? {
        return Err(NumberingError::conflict());
    }

    document_repo::find_for_tenant(conn, &tenant_id, id).await
}
