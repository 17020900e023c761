//! Draft Lifecycle Manager
//!
//! Drafts never occupy a sequence slot. They carry a token (see
//! [`super::token`]) that finalization turns into a definitive number:
//!
//! - provisional `DRAFT-<n>` on a scope with no finalized document keeps `n`
//! - provisional on a scope that already has finalized documents allocates
//! - no usable token, but the caller knows the draft's original number:
//!   reclaim it (swapping it away from a finalized occupant when needed)
//! - otherwise allocate
//!
//! Every function here runs inside one numbering transaction, so a swap is
//! applied completely or not at all.

use super::token::{self, DraftToken};
use super::{allocator, scanner};
use crate::db::repository::{counter, document};
use crate::error::{NumberingError, NumberingResult};
use serde::{Deserialize, Serialize};
use shared::models::{DocumentStatus, Scope, pad_number, parse_sequence_number};
use sqlx::SqliteConnection;

/// `allocateDraftNumber` input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftNumberRequest {
    pub scope: Scope,
    #[serde(default)]
    pub manual_number: Option<String>,
}

/// `finalizeNumber` input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub scope: Scope,
    /// Draft receiving the number
    pub document_id: i64,
    /// Token the caller last saw; the stored one is used when absent
    #[serde(default)]
    pub current_draft_token: Option<String>,
    pub target_status: DocumentStatus,
    #[serde(default)]
    pub manual_number: Option<String>,
    #[serde(default)]
    pub original_draft_number: Option<String>,
}

/// Token for a new draft. Colliding drafts are renamed, never blocked.
pub async fn allocate_draft_number(
    conn: &mut SqliteConnection,
    req: &DraftNumberRequest,
) -> NumberingResult<String> {
    let scope = &req.scope;
    let manual = req
        .manual_number
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let token = match manual {
        Some(manual) => {
            let wanted = parse_sequence_number(manual);
            let taken = scanner::finalized_documents(conn, scope)
                .await?
                .iter()
                .any(|d| {
                    d.number.as_deref() == Some(manual)
                        || (wanted.is_some() && d.sequence_number() == wanted)
                });
            if taken {
                tracing::debug!(
                    tenant_id = %scope.tenant_id,
                    document_type = %scope.document_type,
                    number = manual,
                    "Manual draft number already finalized elsewhere; kept but not promised"
                );
            }
            token::manual(manual)
        }
        None => token::provisional(allocator::peek_next(conn, scope).await?),
    };

    displace_colliding_drafts(conn, scope, &token, None).await?;
    Ok(token)
}

/// Turn a draft into a finalized document and return its definitive number
pub async fn finalize_number(
    conn: &mut SqliteConnection,
    req: &FinalizeRequest,
) -> NumberingResult<String> {
    let scope = &req.scope;
    let doc = document::find_for_tenant(conn, &scope.tenant_id, req.document_id).await?;
    if doc.document_type != scope.document_type {
        return Err(NumberingError::ScopeResolution(format!(
            "document {} is a {}, not a {}",
            doc.id, doc.document_type, scope.document_type
        )));
    }
    if !doc.status.is_draft() {
        return Err(NumberingError::NotDraft(doc.id));
    }
    if !scope.document_type.is_finalized(req.target_status) {
        return Err(NumberingError::StatusNotAllowed {
            document_type: scope.document_type,
            status: req.target_status,
        });
    }

    let current = req.current_draft_token.as_deref().or(doc.number.as_deref());
    let manual = req
        .manual_number
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let number = match manual {
        // Caller validated it; a numeric override is padded and still pushes the counter
        Some(manual) => match parse_sequence_number(manual) {
            Some(n) => {
                counter::raise_to(conn, scope, n).await?;
                pad_number(n)
            }
            None => manual.to_string(),
        },
        None => {
            let original = req
                .original_draft_number
                .as_deref()
                .and_then(token::original_number);
            pad_number(definitive_number(conn, req, DraftToken::parse(current), original).await?)
        }
    };

    if let Some(n) = parse_sequence_number(&number) {
        sweep_stale_drafts(conn, scope, n, doc.id).await?;
    }
    document::assign_number_and_status(conn, doc.id, &number, req.target_status).await?;

    tracing::info!(
        tenant_id = %scope.tenant_id,
        document_type = %scope.document_type,
        prefix = %scope.prefix,
        year = scope.year,
        document_id = doc.id,
        number = %number,
        status = %req.target_status,
        "Document finalized"
    );
    Ok(number)
}

async fn definitive_number(
    conn: &mut SqliteConnection,
    req: &FinalizeRequest,
    current: DraftToken,
    original: Option<i64>,
) -> NumberingResult<i64> {
    let scope = &req.scope;

    if let Some(n) = current.provisional() {
        if scanner::finalized_documents(conn, scope).await?.is_empty() {
            counter::raise_to(conn, scope, n).await?;
            return Ok(n);
        }
        return allocator::next_number(conn, scope).await;
    }

    // No usable token: give the draft back the number the caller knew it by
    let Some(original) = original else {
        return allocator::next_number(conn, scope).await;
    };

    match scanner::occupant_of(conn, scope, original, Some(req.document_id)).await? {
        Some(occupant) if !occupant.status.is_terminal() => {
            // Park the occupant first so `original` is free within this transaction,
            // then hand it a draft identity of its own. `finalize_number` assigns
            // `original` to the finalizing draft afterwards.
            document::update_number(conn, occupant.id, Some(&token::swap_marker())).await?;
            let reclaimed = token::reclaimed_occupant(original);
            document::demote_to_draft(conn, occupant.id, &reclaimed).await?;
            counter::raise_to(conn, scope, original).await?;
            tracing::info!(
                tenant_id = %scope.tenant_id,
                document_type = %scope.document_type,
                number = original,
                document_id = req.document_id,
                occupant_id = occupant.id,
                occupant_token = %reclaimed,
                "Draft number reclaimed by swap"
            );
            Ok(original)
        }
        Some(_) => allocator::next_number(conn, scope).await,
        None => {
            let existing_max = scanner::max_assigned_number(conn, scope).await?;
            if original - 1 > existing_max {
                return allocator::next_number(conn, scope).await;
            }
            counter::raise_to(conn, scope, original).await?;
            tracing::info!(
                tenant_id = %scope.tenant_id,
                document_type = %scope.document_type,
                number = original,
                document_id = req.document_id,
                "Draft number reclaimed"
            );
            Ok(original)
        }
    }
}

/// Rename drafts already holding `token` (or its provisional value)
async fn displace_colliding_drafts(
    conn: &mut SqliteConnection,
    scope: &Scope,
    token: &str,
    exclude_id: Option<i64>,
) -> NumberingResult<()> {
    let claimed = DraftToken::parse(Some(token)).provisional();
    for draft in scanner::draft_documents(conn, scope).await? {
        if Some(draft.id) == exclude_id {
            continue;
        }
        let same_token = draft.number.as_deref() == Some(token);
        let same_value = claimed.is_some()
            && DraftToken::parse(draft.number.as_deref()).provisional() == claimed;
        if same_token || same_value {
            rename_draft(conn, scope, draft.id, draft.number.as_deref()).await?;
        }
    }
    Ok(())
}

/// Rename other drafts whose provisional value is at or below `number`
async fn sweep_stale_drafts(
    conn: &mut SqliteConnection,
    scope: &Scope,
    number: i64,
    finalizing_id: i64,
) -> NumberingResult<()> {
    for draft in scanner::draft_documents(conn, scope).await? {
        if draft.id == finalizing_id {
            continue;
        }
        if DraftToken::parse(draft.number.as_deref())
            .provisional()
            .is_some_and(|m| m <= number)
        {
            rename_draft(conn, scope, draft.id, draft.number.as_deref()).await?;
        }
    }
    Ok(())
}

async fn rename_draft(
    conn: &mut SqliteConnection,
    scope: &Scope,
    id: i64,
    current: Option<&str>,
) -> NumberingResult<()> {
    let renamed = token::displaced(current);
    document::update_number(conn, id, Some(&renamed)).await?;
    tracing::debug!(
        tenant_id = %scope.tenant_id,
        document_type = %scope.document_type,
        document_id = id,
        from = current.unwrap_or_default(),
        to = %renamed,
        "Draft token displaced"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::test_util::{date, document as doc, insert_all, number_of};
    use shared::models::{Document, DocumentType};

    fn scope() -> Scope {
        Scope::new(DocumentType::Invoice, "F", "tenant-a", 2025)
    }

    fn invoice(status: DocumentStatus, number: Option<&str>) -> Document {
        doc(DocumentType::Invoice, status, number, "F", date(2025, 5, 5))
    }

    fn finalize(document_id: i64) -> FinalizeRequest {
        FinalizeRequest {
            scope: scope(),
            document_id,
            current_draft_token: None,
            target_status: DocumentStatus::Pending,
            manual_number: None,
            original_draft_number: None,
        }
    }

    #[tokio::test]
    async fn provisional_draft_number_is_next_without_consuming() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        insert_all(&mut conn, &[invoice(DocumentStatus::Pending, Some("0005"))]).await;

        let req = DraftNumberRequest {
            scope: scope(),
            manual_number: None,
        };
        assert_eq!(allocate_draft_number(&mut conn, &req).await.unwrap(), "DRAFT-0006");
        assert_eq!(allocate_draft_number(&mut conn, &req).await.unwrap(), "DRAFT-0006");
        assert!(counter::find(&mut conn, &scope()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn colliding_draft_is_renamed() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let older = invoice(DocumentStatus::Draft, Some("DRAFT-0001"));
        insert_all(&mut conn, std::slice::from_ref(&older)).await;

        let req = DraftNumberRequest {
            scope: scope(),
            manual_number: None,
        };
        assert_eq!(allocate_draft_number(&mut conn, &req).await.unwrap(), "DRAFT-0001");

        let renamed = number_of(&mut conn, older.id).await.unwrap();
        assert!(renamed.starts_with("DRAFT-0001-"));
    }

    #[tokio::test]
    async fn manual_draft_number_is_kept_even_when_taken() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        insert_all(&mut conn, &[invoice(DocumentStatus::Pending, Some("0001"))]).await;

        let req = DraftNumberRequest {
            scope: scope(),
            manual_number: Some("0001".into()),
        };
        assert_eq!(allocate_draft_number(&mut conn, &req).await.unwrap(), "DRAFT-0001");
    }

    #[tokio::test]
    async fn first_finalize_keeps_provisional_number() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let draft = invoice(DocumentStatus::Draft, Some("DRAFT-0001"));
        let rival = invoice(DocumentStatus::Draft, Some("DRAFT-0001"));
        insert_all(&mut conn, &[draft.clone(), rival.clone()]).await;

        assert_eq!(finalize_number(&mut conn, &finalize(draft.id)).await.unwrap(), "0001");
        assert!(
            number_of(&mut conn, rival.id)
                .await
                .unwrap()
                .starts_with("DRAFT-0001-")
        );
        let counter = counter::find(&mut conn, &scope()).await.unwrap().unwrap();
        assert_eq!(counter.last_number, 1);
    }

    #[tokio::test]
    async fn provisional_is_discarded_once_scope_has_finalized_documents() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let draft = invoice(DocumentStatus::Draft, Some("DRAFT-0001"));
        insert_all(
            &mut conn,
            &[
                invoice(DocumentStatus::Pending, Some("0001")),
                invoice(DocumentStatus::Completed, Some("0002")),
                draft.clone(),
            ],
        )
        .await;

        assert_eq!(finalize_number(&mut conn, &finalize(draft.id)).await.unwrap(), "0003");
    }

    #[tokio::test]
    async fn reclaims_original_number_by_swapping_occupant() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let occupant = invoice(DocumentStatus::Pending, Some("0001"));
        let draft = invoice(DocumentStatus::Draft, Some("DRAFT-T1736000000000"));
        insert_all(&mut conn, &[occupant.clone(), draft.clone()]).await;

        let mut req = finalize(draft.id);
        req.original_draft_number = Some("DRAFT-0001".into());
        assert_eq!(finalize_number(&mut conn, &req).await.unwrap(), "0001");

        let demoted = document::find_by_id(&mut conn, occupant.id).await.unwrap().unwrap();
        assert_eq!(demoted.status, DocumentStatus::Draft);
        assert_eq!(
            DraftToken::parse(demoted.number.as_deref()),
            DraftToken::Displaced(1)
        );
    }

    #[tokio::test]
    async fn canceled_occupant_is_never_swapped() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let occupant = invoice(DocumentStatus::Canceled, Some("0001"));
        let draft = invoice(DocumentStatus::Draft, None);
        insert_all(&mut conn, &[occupant.clone(), draft.clone()]).await;

        let mut req = finalize(draft.id);
        req.original_draft_number = Some("1".into());
        assert_eq!(finalize_number(&mut conn, &req).await.unwrap(), "0002");
        assert_eq!(number_of(&mut conn, occupant.id).await.as_deref(), Some("0001"));
    }

    #[tokio::test]
    async fn reclaim_never_opens_a_gap() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let draft = invoice(DocumentStatus::Draft, Some("DRAFT-0009-77"));
        insert_all(
            &mut conn,
            &[invoice(DocumentStatus::Pending, Some("0001")), draft.clone()],
        )
        .await;

        let mut req = finalize(draft.id);
        req.original_draft_number = Some("DRAFT-0009".into());
        assert_eq!(finalize_number(&mut conn, &req).await.unwrap(), "0002");
    }

    #[tokio::test]
    async fn displaced_draft_without_original_allocates() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let holder = invoice(DocumentStatus::Pending, Some("0001"));
        let draft = invoice(DocumentStatus::Draft, Some("DRAFT-0001-77"));
        insert_all(&mut conn, &[holder.clone(), draft.clone()]).await;

        assert_eq!(finalize_number(&mut conn, &finalize(draft.id)).await.unwrap(), "0002");
        assert_eq!(number_of(&mut conn, holder.id).await.as_deref(), Some("0001"));
    }

    #[tokio::test]
    async fn finalize_sweeps_lower_provisional_drafts() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let finalizing = invoice(DocumentStatus::Draft, Some("DRAFT-0002"));
        let lower = invoice(DocumentStatus::Draft, Some("DRAFT-0001"));
        let higher = invoice(DocumentStatus::Draft, Some("DRAFT-0003"));
        insert_all(&mut conn, &[finalizing.clone(), lower.clone(), higher.clone()]).await;

        assert_eq!(
            finalize_number(&mut conn, &finalize(finalizing.id)).await.unwrap(),
            "0002"
        );
        assert!(
            number_of(&mut conn, lower.id)
                .await
                .unwrap()
                .starts_with("DRAFT-0001-")
        );
        assert_eq!(number_of(&mut conn, higher.id).await.as_deref(), Some("DRAFT-0003"));
    }

    #[tokio::test]
    async fn manual_override_raises_counter() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let draft = invoice(DocumentStatus::Draft, Some("DRAFT-0001"));
        insert_all(&mut conn, std::slice::from_ref(&draft)).await;

        let mut req = finalize(draft.id);
        req.manual_number = Some("0100".into());
        assert_eq!(finalize_number(&mut conn, &req).await.unwrap(), "0100");
        let counter = counter::find(&mut conn, &scope()).await.unwrap().unwrap();
        assert_eq!(counter.last_number, 100);
    }

    #[tokio::test]
    async fn numeric_manual_override_is_padded() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let held = invoice(DocumentStatus::Pending, Some("0005"));
        let first = invoice(DocumentStatus::Draft, None);
        let second = invoice(DocumentStatus::Draft, None);
        let third = invoice(DocumentStatus::Draft, None);
        insert_all(&mut conn, &[held, first.clone(), second.clone(), third.clone()]).await;

        let mut req = finalize(first.id);
        req.manual_number = Some("6".into());
        assert_eq!(finalize_number(&mut conn, &req).await.unwrap(), "0006");
        assert_eq!(number_of(&mut conn, first.id).await.as_deref(), Some("0006"));

        // "5" is the same number as the stored "0005"
        let mut req = finalize(second.id);
        req.manual_number = Some("5".into());
        let err = finalize_number(&mut conn, &req).await.unwrap_err();
        assert!(err.is_conflict());

        // Free text is kept as typed
        let mut req = finalize(third.id);
        req.manual_number = Some("F-2025-A".into());
        assert_eq!(finalize_number(&mut conn, &req).await.unwrap(), "F-2025-A");
    }

    #[tokio::test]
    async fn finalize_rejects_non_drafts_and_foreign_statuses() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let done = invoice(DocumentStatus::Pending, Some("0001"));
        let draft = invoice(DocumentStatus::Draft, None);
        insert_all(&mut conn, &[done.clone(), draft.clone()]).await;

        let err = finalize_number(&mut conn, &finalize(done.id)).await.unwrap_err();
        assert!(matches!(err, NumberingError::NotDraft(id) if id == done.id));

        let mut req = finalize(draft.id);
        req.target_status = DocumentStatus::Delivered;
        let err = finalize_number(&mut conn, &req).await.unwrap_err();
        assert!(matches!(err, NumberingError::StatusNotAllowed { .. }));
    }
}
