//! Document Model (invoices, quotes, credit notes, purchase orders)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of numbered document.
///
/// Each type carries its own numbering policy: which statuses occupy a
/// sequence slot and which prefix template a tenant starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DocumentType {
    Invoice,
    Quote,
    CreditNote,
    PurchaseOrder,
}

const SALES_FINALIZED: &[DocumentStatus] = &[
    DocumentStatus::Pending,
    DocumentStatus::Completed,
    DocumentStatus::Canceled,
];

const PURCHASE_FINALIZED: &[DocumentStatus] = &[
    DocumentStatus::Confirmed,
    DocumentStatus::InProgress,
    DocumentStatus::Delivered,
    DocumentStatus::Canceled,
];

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Invoice,
        DocumentType::Quote,
        DocumentType::CreditNote,
        DocumentType::PurchaseOrder,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "INVOICE",
            Self::Quote => "QUOTE",
            Self::CreditNote => "CREDIT_NOTE",
            Self::PurchaseOrder => "PURCHASE_ORDER",
        }
    }

    /// Statuses that occupy a sequence slot for this document type
    pub fn finalized_statuses(&self) -> &'static [DocumentStatus] {
        match self {
            Self::Invoice | Self::Quote | Self::CreditNote => SALES_FINALIZED,
            Self::PurchaseOrder => PURCHASE_FINALIZED,
        }
    }

    pub fn is_finalized(&self, status: DocumentStatus) -> bool {
        self.finalized_statuses().contains(&status)
    }

    /// Whether `status` exists at all for this document type
    pub fn allows(&self, status: DocumentStatus) -> bool {
        status == DocumentStatus::Draft || self.is_finalized(status)
    }

    /// Prefix a tenant starts from until they choose their own.
    ///
    /// Placeholders are expanded by [`crate::models::expand_prefix`].
    pub const fn default_prefix_template(&self) -> &'static str {
        match self {
            Self::Invoice => "F-{YYYY}{MM}",
            Self::Quote => "D-{YYYY}{MM}",
            Self::CreditNote => "A-{YYYY}{MM}",
            Self::PurchaseOrder => "BC-{YYYY}{MM}",
        }
    }

    /// Human label used in log lines and error messages
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Invoice => "Invoice",
            Self::Quote => "Quote",
            Self::CreditNote => "Credit note",
            Self::PurchaseOrder => "Purchase order",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "INVOICE" => Ok(Self::Invoice),
            "QUOTE" => Ok(Self::Quote),
            "CREDIT_NOTE" => Ok(Self::CreditNote),
            "PURCHASE_ORDER" => Ok(Self::PurchaseOrder),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Document lifecycle status.
///
/// The set is shared by all document types; [`DocumentType::allows`] tells
/// which ones apply to a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DocumentStatus {
    Draft,
    Pending,
    Completed,
    Confirmed,
    InProgress,
    Delivered,
    Canceled,
}

impl DocumentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Confirmed => "CONFIRMED",
            Self::InProgress => "IN_PROGRESS",
            Self::Delivered => "DELIVERED",
            Self::Canceled => "CANCELED",
        }
    }

    pub const fn is_draft(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Canceled documents keep their number and never move again
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "DRAFT" => Ok(Self::Draft),
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "CONFIRMED" => Ok(Self::Confirmed),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Parse failure for [`DocumentType`] / [`DocumentStatus`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

/// Document row as persisted by the document services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Document {
    pub id: i64,
    pub tenant_id: String,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    /// Zero-padded sequence value, draft token, or absent
    pub number: Option<String>,
    #[serde(default)]
    pub prefix: String,
    pub issue_date: NaiveDate,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Document {
    /// Sequence value when the document holds a purely numeric number
    pub fn sequence_number(&self) -> Option<i64> {
        self.number
            .as_deref()
            .and_then(crate::models::parse_sequence_number)
    }

    pub fn is_finalized(&self) -> bool {
        self.document_type.is_finalized(self.status)
    }
}

/// Create document payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub tenant_id: String,
    pub document_type: DocumentType,
    /// `DRAFT` or one of the type's finalized statuses
    pub status: DocumentStatus,
    /// Prefix template; the type's default is used when absent
    #[serde(default)]
    pub prefix: Option<String>,
    pub issue_date: NaiveDate,
    /// Caller-chosen number (validated before use on finalized creation)
    #[serde(default)]
    pub manual_number: Option<String>,
}

/// Finalize document payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeDocument {
    pub tenant_id: String,
    pub document_id: i64,
    pub target_status: DocumentStatus,
    #[serde(default)]
    pub manual_number: Option<String>,
    /// Number the user knew this draft by before it was displaced
    #[serde(default)]
    pub original_draft_number: Option<String>,
}
