//! Draft lifecycle: provisional numbers, finalization, reclaim swaps

mod common;

use common::{TENANT, date, invoice, new_document, setup};
use doc_numbering::NumberingError;
use doc_numbering::numbering::token::DraftToken;
use doc_numbering::{DraftNumberRequest, FinalizeRequest};
use shared::models::{DocumentStatus, DocumentType, FinalizeDocument, RejectReason, Scope};

fn finalize(id: i64) -> FinalizeDocument {
    FinalizeDocument {
        tenant_id: TENANT.into(),
        document_id: id,
        target_status: DocumentStatus::Pending,
        manual_number: None,
        original_draft_number: None,
    }
}

#[tokio::test]
async fn draft_keeps_its_provisional_number_on_a_fresh_scope() {
    let env = setup().await;
    let draft = env.service.create(invoice(DocumentStatus::Draft)).await.unwrap();
    assert_eq!(draft.number.as_deref(), Some("DRAFT-0001"));

    let finalized = env.service.finalize(finalize(draft.id)).await.unwrap();
    assert_eq!(finalized.number.as_deref(), Some("0001"));
    assert_eq!(finalized.status, DocumentStatus::Pending);
}

#[tokio::test]
async fn stale_provisional_number_is_replaced_by_the_allocator() {
    let env = setup().await;
    let draft = env.service.create(invoice(DocumentStatus::Draft)).await.unwrap();
    env.service.create(invoice(DocumentStatus::Pending)).await.unwrap();
    env.service.create(invoice(DocumentStatus::Pending)).await.unwrap();

    let finalized = env.service.finalize(finalize(draft.id)).await.unwrap();
    assert_eq!(finalized.number.as_deref(), Some("0003"));
}

#[tokio::test]
async fn reclaim_swaps_the_number_back_to_the_original_draft() {
    let env = setup().await;

    // The user has been calling this draft "#1"
    let draft = env.service.create(invoice(DocumentStatus::Draft)).await.unwrap();
    assert_eq!(draft.number.as_deref(), Some("DRAFT-0001"));

    // Meanwhile another document is issued and takes 0001; the draft is displaced
    let interloper = env.service.create(invoice(DocumentStatus::Pending)).await.unwrap();
    assert_eq!(interloper.number.as_deref(), Some("0001"));
    let displaced = env.service.get(TENANT, draft.id).await.unwrap();
    assert_eq!(
        DraftToken::parse(displaced.number.as_deref()),
        DraftToken::Displaced(1)
    );

    let mut req = finalize(draft.id);
    req.original_draft_number = Some("DRAFT-0001".into());
    let finalized = env.service.finalize(req).await.unwrap();
    assert_eq!(finalized.number.as_deref(), Some("0001"));

    // The interloper is a draft again, with its own identity
    let interloper = env.service.get(TENANT, interloper.id).await.unwrap();
    assert_eq!(interloper.status, DocumentStatus::Draft);
    assert_eq!(
        DraftToken::parse(interloper.number.as_deref()),
        DraftToken::Displaced(1)
    );

    // and gets the next number when finalized again
    let reissued = env.service.finalize(finalize(interloper.id)).await.unwrap();
    assert_eq!(reissued.number.as_deref(), Some("0002"));
}

#[tokio::test]
async fn reclaim_fills_a_free_original_number() {
    let env = setup().await;
    let draft = env.service.create(invoice(DocumentStatus::Draft)).await.unwrap();
    let first = env.service.create(invoice(DocumentStatus::Pending)).await.unwrap();
    env.service.create(invoice(DocumentStatus::Pending)).await.unwrap();
    env.service.delete(TENANT, first.id).await.unwrap();

    let mut req = finalize(draft.id);
    req.original_draft_number = Some("1".into());
    let finalized = env.service.finalize(req).await.unwrap();
    assert_eq!(finalized.number.as_deref(), Some("0001"));
}

#[tokio::test]
async fn manual_numbers_at_finalize_are_validated() {
    let env = setup().await;
    env.service.create(invoice(DocumentStatus::Pending)).await.unwrap();
    let draft = env.service.create(invoice(DocumentStatus::Draft)).await.unwrap();

    let mut gap = finalize(draft.id);
    gap.manual_number = Some("0007".into());
    let err = env.service.finalize(gap).await.unwrap_err();
    assert!(matches!(
        err,
        NumberingError::InvalidManualNumber(RejectReason::WouldCreateGap { expected: 2 })
    ));

    // Nothing changed: the draft can still be finalized with the right number
    let mut next = finalize(draft.id);
    next.manual_number = Some("2".into());
    let finalized = env.service.finalize(next).await.unwrap();
    assert_eq!(finalized.number.as_deref(), Some("0002"));
}

#[tokio::test]
async fn manual_draft_number_is_not_promised() {
    let env = setup().await;
    env.service.create(invoice(DocumentStatus::Pending)).await.unwrap();

    let mut with_manual = invoice(DocumentStatus::Draft);
    with_manual.manual_number = Some("0001".into());
    let draft = env.service.create(with_manual).await.unwrap();
    assert_eq!(draft.number.as_deref(), Some("DRAFT-0001"));

    let finalized = env.service.finalize(finalize(draft.id)).await.unwrap();
    assert_eq!(finalized.number.as_deref(), Some("0002"));
}

#[tokio::test]
async fn purchase_orders_move_through_their_own_statuses() {
    let env = setup().await;
    let po = env
        .service
        .create(new_document(
            DocumentType::PurchaseOrder,
            DocumentStatus::Draft,
            "BC-{YYYY}{MM}",
            date(2025, 7, 9),
        ))
        .await
        .unwrap();
    assert_eq!(po.prefix, "BC-202507");

    let err = env
        .service
        .update_status(TENANT, po.id, DocumentStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, NumberingError::StatusNotAllowed { .. }));

    for status in [
        DocumentStatus::Confirmed,
        DocumentStatus::InProgress,
        DocumentStatus::Delivered,
    ] {
        let updated = env.service.update_status(TENANT, po.id, status).await.unwrap();
        assert_eq!(updated.status, status);
        assert_eq!(updated.number.as_deref(), Some("0001"));
    }
}

#[tokio::test]
async fn a_draft_is_finalized_only_once_under_concurrency() {
    let env = setup().await;
    let draft = env.service.create(invoice(DocumentStatus::Draft)).await.unwrap();

    let a = {
        let service = env.service.clone();
        tokio::spawn(async move { service.finalize(finalize(draft.id)).await })
    };
    let b = {
        let service = env.service.clone();
        tokio::spawn(async move { service.finalize(finalize(draft.id)).await })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(NumberingError::NotDraft(id)) if *id == draft.id))
    );
}

#[tokio::test]
async fn engine_contract_without_the_document_service() {
    let env = setup().await;
    let engine = env.service.engine();
    let scope = Scope::new(DocumentType::CreditNote, "A-202502", TENANT, 2025);

    let token = engine
        .allocate_draft_number(&DraftNumberRequest {
            scope: scope.clone(),
            manual_number: None,
        })
        .await
        .unwrap();
    assert_eq!(token, "DRAFT-0001");

    let credit_note = env
        .service
        .create(new_document(
            DocumentType::CreditNote,
            DocumentStatus::Draft,
            "A-{YYYY}{MM}",
            date(2025, 2, 14),
        ))
        .await
        .unwrap();

    let number = engine
        .finalize_number(&FinalizeRequest {
            scope,
            document_id: credit_note.id,
            current_draft_token: credit_note.number.clone(),
            target_status: DocumentStatus::Completed,
            manual_number: None,
            original_draft_number: None,
        })
        .await
        .unwrap();
    assert_eq!(number, "0001");

    let stored = env.service.get(TENANT, credit_note.id).await.unwrap();
    assert_eq!(stored.number.as_deref(), Some("0001"));
    assert_eq!(stored.status, DocumentStatus::Completed);
}
