//! Numbering Model (scopes, counters, manual number validation)

use super::document::DocumentType;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a definitive document number ("0001")
pub const NUMBER_WIDTH: usize = 4;

/// Zero-pad a sequence value to [`NUMBER_WIDTH`] digits
pub fn pad_number(n: i64) -> String {
    format!("{n:0width$}", width = NUMBER_WIDTH)
}

/// Parse a purely numeric document number ("0042" -> 42).
///
/// Anything with a non-digit (draft tokens, free text) is `None`.
pub fn parse_sequence_number(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Expand `{YYYY}`, `{YY}` and `{MM}` in a prefix template from the issue date
pub fn expand_prefix(template: &str, issue_date: NaiveDate) -> String {
    template
        .replace("{YYYY}", &format!("{:04}", issue_date.year()))
        .replace("{YY}", &format!("{:02}", issue_date.year() % 100))
        .replace("{MM}", &format!("{:02}", issue_date.month()))
}

/// Unit of sequence isolation: `(document type, prefix, tenant, year)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub document_type: DocumentType,
    /// Empty prefix means "every prefix of this tenant/type/year" when scanning
    #[serde(default)]
    pub prefix: String,
    pub tenant_id: String,
    pub year: i32,
}

/// Why a scope could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("tenant id is missing")]
    MissingTenant,
    #[error("year {0} is out of range")]
    InvalidYear(i32),
}

impl Scope {
    pub fn new(
        document_type: DocumentType,
        prefix: impl Into<String>,
        tenant_id: impl Into<String>,
        year: i32,
    ) -> Self {
        Self {
            document_type,
            prefix: prefix.into(),
            tenant_id: tenant_id.into(),
            year,
        }
    }

    /// Build the scope of a document from its issue date and prefix template
    pub fn resolve(
        document_type: DocumentType,
        prefix_template: Option<&str>,
        tenant_id: &str,
        issue_date: NaiveDate,
    ) -> Result<Self, ScopeError> {
        let template = prefix_template.unwrap_or(document_type.default_prefix_template());
        let scope = Self::new(
            document_type,
            expand_prefix(template, issue_date),
            tenant_id,
            issue_date.year(),
        );
        scope.check()?;
        Ok(scope)
    }

    /// Reject scopes that can never address a real sequence
    pub fn check(&self) -> Result<(), ScopeError> {
        if self.tenant_id.trim().is_empty() {
            return Err(ScopeError::MissingTenant);
        }
        self.year_bounds()?;
        Ok(())
    }

    /// `[Jan 1 of year, Jan 1 of year + 1)` for issue date filtering
    pub fn year_bounds(&self) -> Result<(NaiveDate, NaiveDate), ScopeError> {
        let start = NaiveDate::from_ymd_opt(self.year, 1, 1);
        let end = self
            .year
            .checked_add(1)
            .and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1));
        match (start, end) {
            (Some(start), Some(end)) if self.year > 0 => Ok((start, end)),
            _ => Err(ScopeError::InvalidYear(self.year)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.tenant_id, self.document_type, self.prefix, self.year
        )
    }
}

/// Persisted counter: last sequence value issued for a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Counter {
    pub document_type: DocumentType,
    pub prefix: String,
    pub tenant_id: String,
    pub year: i32,
    pub last_number: i64,
    pub updated_at: i64,
}

impl Counter {
    pub fn scope(&self) -> Scope {
        Scope::new(
            self.document_type,
            self.prefix.clone(),
            self.tenant_id.clone(),
            self.year,
        )
    }
}

/// Why a manual number was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// Not a positive integer
    NotANumber,
    /// A finalized document in the scope already holds it
    AlreadyUsed,
    /// At or below the current maximum
    NotNextInSequence { expected: i64 },
    /// Beyond the next number
    WouldCreateGap { expected: i64 },
    /// Leaves no successor for the sequence
    OutOfRange,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => f.write_str("not a positive number"),
            Self::AlreadyUsed => f.write_str("already used"),
            Self::NotNextInSequence { expected } => write!(
                f,
                "must continue the sequence (next number is {})",
                pad_number(*expected)
            ),
            Self::WouldCreateGap { expected } => write!(
                f,
                "would leave a gap in the sequence (next number is {})",
                pad_number(*expected)
            ),
            Self::OutOfRange => f.write_str("exceeds the largest supported number"),
        }
    }
}

/// Result of a manual number pre-check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl ValidationOutcome {
    pub const fn accepted() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub const fn rejected(reason: RejectReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }

    /// Human-readable reason, `None` when valid
    pub fn message(&self) -> Option<String> {
        self.reason.map(|r| r.to_string())
    }
}
