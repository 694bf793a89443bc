//! Month-key model.
//!
//! # Responsibility
//! - Validate and carry the canonical `YYYY-MM` key that names one ledger.
//! - Derive the current key from local wall-clock time.
//!
//! # Invariants
//! - A `MonthKey` always holds four ASCII year digits and a zero-padded
//!   month in `01..=12`.
//! - The key is never stored inside a ledger document; it is the document id.

use crate::model::validation::ValidationError;
use chrono::{Datelike, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static MONTH_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])$").expect("valid month key regex"));

const MONTH_NAMES: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Canonical identifier of one attendance ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey(String);

impl MonthKey {
    /// Parses a `YYYY-MM` key. Surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if !MONTH_KEY_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidMonthKey(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Builds a key from calendar parts.
    pub fn from_parts(year: i32, month: u32) -> Result<Self, ValidationError> {
        Self::parse(&format!("{year:04}-{month:02}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> i32 {
        self.0[..4].parse().unwrap_or_default()
    }

    pub fn month(&self) -> u32 {
        self.0[5..].parse().unwrap_or_default()
    }

    /// Human label shown in view headers, e.g. `Maret 2025`.
    pub fn label(&self) -> String {
        let index = self.month().saturating_sub(1) as usize;
        let name = MONTH_NAMES.get(index).copied().unwrap_or("?");
        format!("{name} {}", self.year())
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.0
    }
}

/// Returns the key for the current local month.
pub fn current_month_key() -> MonthKey {
    let now = Local::now();
    MonthKey(format!("{:04}-{:02}", now.year(), now.month()))
}
