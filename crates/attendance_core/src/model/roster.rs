//! Roster domain model.
//!
//! # Responsibility
//! - Define categories and the people they own.
//! - Provide the deterministic color palette used for new categories.
//!
//! # Invariants
//! - A person belongs to exactly one category.
//! - Category order is creation order and is never resorted.
//! - People order inside a category is insertion order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque category identifier (`cat_<uuid>`).
pub type CategoryId = String;
/// Opaque person identifier (`user_<uuid>`).
pub type PersonId = String;

/// Cyclic display palette. The n-th category gets `COLOR_PALETTE[n % len]`.
pub const COLOR_PALETTE: [&str; 7] = [
    "#1abc9c", "#3498db", "#9b59b6", "#f1c40f", "#e67e22", "#e74c3c", "#34495e",
];

/// Returns the palette color for a category created when `existing` already exist.
pub fn palette_color(existing: usize) -> &'static str {
    COLOR_PALETTE[existing % COLOR_PALETTE.len()]
}

/// Generates a fresh category id.
pub fn new_category_id() -> CategoryId {
    format!("cat_{}", Uuid::new_v4().simple())
}

/// Generates a fresh person id.
pub fn new_person_id() -> PersonId {
    format!("user_{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Display token from `COLOR_PALETTE`.
    pub color: String,
    pub people: Vec<Person>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Category {
    pub fn person(&self, person_id: &str) -> Option<&Person> {
        self.people.iter().find(|person| person.id == person_id)
    }
}

/// Snapshot of all categories in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub categories: Vec<Category>,
}

impl Roster {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|category| category.id == category_id)
    }

    /// Iterates every person across categories, in roster order.
    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.categories
            .iter()
            .flat_map(|category| category.people.iter())
    }

    pub fn person_ids(&self) -> Vec<PersonId> {
        self.people().map(|person| person.id.clone()).collect()
    }

    pub fn contains_person(&self, person_id: &str) -> bool {
        self.people().any(|person| person.id == person_id)
    }

    pub fn person_count(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.people.len())
            .sum()
    }
}
