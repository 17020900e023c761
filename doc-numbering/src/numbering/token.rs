//! Draft tokens
//!
//! A draft's `number` column holds a token that can never be mistaken for a
//! definitive number because it is never purely numeric:
//!
//! | token                     | meaning                                   |
//! |---------------------------|-------------------------------------------|
//! | `DRAFT-0006`              | provisional number 6                      |
//! | `DRAFT-0006-<suffix>`     | displaced: once 6, renamed after a clash  |
//! | anything else, or absent  | placeholder with no numeric claim         |

use shared::models::{pad_number, parse_sequence_number};

pub const DRAFT_PREFIX: &str = "DRAFT-";
pub const SWAP_PREFIX: &str = "SWAP-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftToken {
    /// Carries a usable provisional sequence value
    Provisional(i64),
    /// Renamed after a collision; remembers the value it used to claim
    Displaced(i64),
    /// No numeric claim
    Placeholder,
}

impl DraftToken {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(rest) = raw.and_then(|r| r.strip_prefix(DRAFT_PREFIX)) else {
            return Self::Placeholder;
        };
        match rest.split_once('-') {
            None => parse_sequence_number(rest).map_or(Self::Placeholder, Self::Provisional),
            Some((digits, suffix)) if !suffix.is_empty() => {
                parse_sequence_number(digits).map_or(Self::Placeholder, Self::Displaced)
            }
            Some(_) => Self::Placeholder,
        }
    }

    /// Value still claimed by the draft, if any
    pub fn provisional(&self) -> Option<i64> {
        match self {
            Self::Provisional(n) if *n > 0 => Some(*n),
            _ => None,
        }
    }

    /// Value the draft was once known by (provisional or displaced)
    pub fn remembered(&self) -> Option<i64> {
        match self {
            Self::Provisional(n) | Self::Displaced(n) if *n > 0 => Some(*n),
            _ => None,
        }
    }
}

/// `DRAFT-0006`
pub fn provisional(n: i64) -> String {
    format!("{DRAFT_PREFIX}{}", pad_number(n))
}

/// Caller-chosen draft number, kept verbatim: `DRAFT-<manual>`
pub fn manual(number: &str) -> String {
    format!("{DRAFT_PREFIX}{number}")
}

/// Unique rename of a colliding draft token (`DRAFT-0006` -> `DRAFT-0006-<id>`)
pub fn displaced(current: Option<&str>) -> String {
    let base = current
        .filter(|t| t.starts_with(DRAFT_PREFIX))
        .map(|t| match DraftToken::parse(Some(t)) {
            DraftToken::Displaced(n) => provisional(n),
            _ => t.to_string(),
        })
        .unwrap_or_else(|| format!("{DRAFT_PREFIX}T"));
    format!("{base}-{}", shared::util::snowflake_id())
}

/// Fresh draft identity for a document that gave its number away in a swap
pub fn reclaimed_occupant(original: i64) -> String {
    format!("{}-{}", provisional(original), shared::util::snowflake_id())
}

/// Short-lived marker held by a swap occupant inside the swap transaction
pub fn swap_marker() -> String {
    format!("{SWAP_PREFIX}{}", shared::util::snowflake_id())
}

/// Number a user refers to a draft by: `52`, `0052`, `DRAFT-0052` or `DRAFT-0052-<suffix>`
pub fn original_number(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    parse_sequence_number(raw)
        .filter(|n| *n > 0)
        .or_else(|| DraftToken::parse(Some(raw)).remembered())
}
