//! Sequence Validator
//!
//! Read-only pre-check for a manually chosen number.

use super::scanner;
use crate::error::NumberingResult;
use shared::models::{RejectReason, Scope, ValidationOutcome, parse_sequence_number};
use sqlx::SqliteConnection;
use std::collections::BTreeSet;

/// Judge `candidate` against the numbers already held in the scope.
///
/// Drafts accept anything. Otherwise the number must be `max + 1`, except
/// on an empty scope where any positive number starts the sequence.
pub fn evaluate(candidate: &str, assigned: &BTreeSet<i64>, is_draft: bool) -> ValidationOutcome {
    if is_draft {
        return ValidationOutcome::accepted();
    }
    let Some(n) = parse_sequence_number(candidate.trim()).filter(|n| *n > 0) else {
        return ValidationOutcome::rejected(RejectReason::NotANumber);
    };
    if n == i64::MAX {
        return ValidationOutcome::rejected(RejectReason::OutOfRange);
    }
    if assigned.contains(&n) {
        return ValidationOutcome::rejected(RejectReason::AlreadyUsed);
    }

    let current_max = assigned.last().copied().unwrap_or(0);
    let Some(expected) = current_max.checked_add(1) else {
        return ValidationOutcome::rejected(RejectReason::OutOfRange);
    };
    if current_max == 0 || n == expected {
        ValidationOutcome::accepted()
    } else if n < expected {
        ValidationOutcome::rejected(RejectReason::NotNextInSequence { expected })
    } else {
        ValidationOutcome::rejected(RejectReason::WouldCreateGap { expected })
    }
}

pub async fn validate(
    conn: &mut SqliteConnection,
    scope: &Scope,
    candidate: &str,
    is_draft: bool,
) -> NumberingResult<ValidationOutcome> {
    if is_draft {
        return Ok(ValidationOutcome::accepted());
    }
    let docs = scanner::finalized_documents(conn, scope).await?;
    Ok(evaluate(candidate, &scanner::sequence_numbers(&docs), is_draft))
}
