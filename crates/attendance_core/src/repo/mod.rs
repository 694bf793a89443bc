//! Repository contracts over the document store.
//!
//! # Responsibility
//! - Map roster and ledger use-cases onto document reads/writes.
//! - Keep document layout (collection names, field names, labels) in one place.
//!
//! # Invariants
//! - Validation runs before any store call; rejected input writes nothing.
//! - `NotFound` is reserved for roster ids. Ledger writes tolerate unknown person ids.

use crate::model::roster::{CategoryId, PersonId};
use crate::model::validation::ValidationError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod ledger_repo;
pub mod roster_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    CategoryNotFound(CategoryId),
    PersonNotFound {
        category_id: CategoryId,
        person_id: PersonId,
    },
    Store(StoreError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::PersonNotFound {
                category_id,
                person_id,
            } => write!(f, "person {person_id} not found in category {category_id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::CategoryNotFound(_) | Self::PersonNotFound { .. } => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
