//! Sequential document numbering
//!
//! # Components
//!
//! - [`scanner`]: highest number actually held by finalized documents
//! - `allocator`: reconcile the counter, then advance it atomically. Only
//!   reachable from units of work that persist the number they allocate.
//! - [`drafts`]: draft tokens and finalization (keep, allocate, reclaim, swap)
//! - [`validator`]: read-only check of a manually chosen number
//! - [`token`]: draft token grammar
//! - [`retry`]: backoff policy for conflicting transactions
//!
//! Counter rows live in [`crate::db::repository::counter`].
//!
//! # Transactions
//!
//! Every engine call is one unit of work on an explicit connection. The
//! [`NumberingEngine`] opens a transaction, takes the SQLite write lock before
//! reading anything, runs the work and commits. A conflict (busy database,
//! unique violation, lost compare-and-set) rolls the whole unit back and
//! re-runs it under [`RetryPolicy`]; nothing is ever half applied.

pub(crate) mod allocator;
pub mod drafts;
pub mod retry;
pub mod scanner;
pub mod token;
pub mod validator;

pub use drafts::{DraftNumberRequest, FinalizeRequest};
pub use retry::RetryPolicy;

use crate::db::DbService;
use crate::db::repository::counter;
use crate::error::{NumberingError, NumberingResult};
use futures::future::BoxFuture;
use serde::Serialize;
use shared::models::{Scope, ValidationOutcome, pad_number};
use sqlx::SqliteConnection;

/// Outcome of a counter reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub scope: Scope,
    /// `None` when the scope had no counter row
    pub counter_before: Option<i64>,
    pub existing_max: i64,
    pub counter_after: i64,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.counter_before != Some(self.counter_after)
    }
}

/// Numbering engine: the only entry point document services use
#[derive(Clone)]
pub struct NumberingEngine {
    db: DbService,
    retry: RetryPolicy,
}

impl NumberingEngine {
    pub fn new(db: DbService, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    pub fn db(&self) -> &DbService {
        &self.db
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run `work` in a write transaction, re-running it on conflicts.
    ///
    /// `work` may be called several times and must rebuild any state it
    /// needs from its captured inputs on every call.
    pub async fn transaction<T, F>(&self, operation: &'static str, mut work: F) -> NumberingResult<T>
    where
        F: for<'c> FnMut(&'c mut SqliteConnection) -> BoxFuture<'c, NumberingResult<T>>,
    {
        let attempts = self.retry.total_attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.run_once(&mut work).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_conflict() && attempt < attempts => {
                    let delay = self.retry.delay_for(attempt - 1);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Numbering conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_conflict() => {
                    return Err(NumberingError::ConcurrencyConflict { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_once<T, F>(&self, work: &mut F) -> NumberingResult<T>
    where
        F: for<'c> FnMut(&'c mut SqliteConnection) -> BoxFuture<'c, NumberingResult<T>>,
    {
        let mut tx = self.db.pool.begin().await?;
        counter::acquire_write_lock(&mut *tx).await?;

        match work(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Numbering rollback failed");
                }
                Err(e)
            }
        }
    }

    /// `allocateDraftNumber`: draft token for a new draft
    pub async fn allocate_draft_number(&self, req: &DraftNumberRequest) -> NumberingResult<String> {
        req.scope.check()?;
        self.transaction("allocate_draft_number", |conn| {
            let req = req.clone();
            Box::pin(async move { drafts::allocate_draft_number(conn, &req).await })
        })
        .await
    }

    /// `finalizeNumber`: definitive number, written onto the document with its new status
    pub async fn finalize_number(&self, req: &FinalizeRequest) -> NumberingResult<String> {
        req.scope.check()?;
        self.transaction("finalize_number", |conn| {
            let req = req.clone();
            Box::pin(async move { drafts::finalize_number(conn, &req).await })
        })
        .await
    }

    /// `validateManualNumber`: read-only pre-check
    pub async fn validate_manual_number(
        &self,
        scope: &Scope,
        candidate: &str,
        is_draft: bool,
    ) -> NumberingResult<ValidationOutcome> {
        scope.check()?;
        let mut conn = self.db.pool.acquire().await?;
        validator::validate(&mut conn, scope, candidate, is_draft).await
    }

    /// Number the next finalization would get, without allocating it
    pub async fn peek_next_number(&self, scope: &Scope) -> NumberingResult<String> {
        scope.check()?;
        let mut conn = self.db.pool.acquire().await?;
        Ok(pad_number(allocator::peek_next(&mut conn, scope).await?))
    }

    /// Set the counter to exactly what the finalized documents hold
    pub async fn reconcile_counter(&self, scope: &Scope) -> NumberingResult<ReconcileReport> {
        scope.check()?;
        self.transaction("reconcile_counter", |conn| {
            let scope = scope.clone();
            Box::pin(async move { reconcile(conn, scope).await })
        })
        .await
    }

    /// Reconcile every stored counter
    pub async fn reconcile_all(&self) -> NumberingResult<Vec<ReconcileReport>> {
        self.transaction("reconcile_all", |conn| {
            Box::pin(async move {
                let counters = counter::find_all(&mut *conn).await?;
                let mut reports = Vec::with_capacity(counters.len());
                for c in counters {
                    reports.push(reconcile(&mut *conn, c.scope()).await?);
                }
                Ok(reports)
            })
        })
        .await
    }
}

async fn reconcile(conn: &mut SqliteConnection, scope: Scope) -> NumberingResult<ReconcileReport> {
    let counter_before = counter::find(conn, &scope).await?.map(|c| c.last_number);
    let existing_max = scanner::max_assigned_number(conn, &scope).await?;
    if counter_before != Some(existing_max) {
        counter::force_set(conn, &scope, existing_max).await?;
        tracing::warn!(
            tenant_id = %scope.tenant_id,
            document_type = %scope.document_type,
            prefix = %scope.prefix,
            year = scope.year,
            counter_before = ?counter_before,
            existing_max,
            "Counter reconciled"
        );
    }
    Ok(ReconcileReport {
        scope,
        counter_before,
        existing_max,
        counter_after: existing_max,
    })
}
