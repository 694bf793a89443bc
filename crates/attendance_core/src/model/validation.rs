//! Input validation errors shared by roster and ledger mutations.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected caller input. Never leaves any state changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Category name is empty after trimming.
    EmptyCategoryName,
    /// Person name is empty after trimming.
    EmptyPersonName,
    /// Person id is empty after trimming.
    EmptyPersonId,
    /// Bulk status change was requested for zero people.
    EmptyBulkSelection,
    /// Month key is not in canonical `YYYY-MM` form.
    InvalidMonthKey(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCategoryName => write!(f, "category name is required"),
            Self::EmptyPersonName => write!(f, "person name is required"),
            Self::EmptyPersonId => write!(f, "person id must not be empty"),
            Self::EmptyBulkSelection => write!(f, "no people selected for bulk update"),
            Self::InvalidMonthKey(value) => {
                write!(f, "month key must be `YYYY-MM`, got `{value}`")
            }
        }
    }
}

impl Error for ValidationError {}

/// Trims a required name, rejecting blank input with `err`.
pub(crate) fn require_name(value: &str, err: ValidationError) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_string())
}
