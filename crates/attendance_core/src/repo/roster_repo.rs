//! Roster Store: categories and the people they own.
//!
//! # Responsibility
//! - Persist one `categories` document per category, embedding its people.
//! - Assign palette colors and fresh ids on creation.
//!
//! # Invariants
//! - Listing is ordered by `createdAt`, ties by insertion order.
//! - A new category's color comes from the category count read in the same
//!   write that inserts it, so concurrent adds never share a palette slot.
//! - People-list edits run inside one store transaction (`mutate`), so two
//!   concurrent `add_person` calls on one category never drop each other.
//! - Deleting a category or person never touches any attendance ledger.

use crate::model::roster::{
    new_category_id, new_person_id, palette_color, Category, Person, Roster,
};
use crate::model::validation::{require_name, ValidationError};
use crate::repo::{RepoError, RepoResult};
use crate::store::{Document, DocumentStore, OrderBy, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collection holding one document per category.
pub const CATEGORIES_COLLECTION: &str = "categories";

const USERS_FIELD: &str = "users";
const CREATED_AT_FIELD: &str = "createdAt";

/// Persisted body of a category document. The id is the document id.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryBody {
    name: String,
    color: String,
    #[serde(default)]
    users: Vec<Person>,
    created_at: i64,
}

/// Repository interface for roster membership.
pub trait RosterRepository {
    /// Loads every category in creation order.
    fn load_roster(&self) -> RepoResult<Roster>;
    fn add_category(&self, name: &str) -> RepoResult<Category>;
    /// Removes a category and, with it, all of its people.
    fn delete_category(&self, category_id: &str) -> RepoResult<()>;
    /// Appends a person to the end of a category's list.
    fn add_person(&self, category_id: &str, name: &str) -> RepoResult<Person>;
    fn delete_person(&self, category_id: &str, person_id: &str) -> RepoResult<()>;
}

/// Roster repository backed by a `DocumentStore`.
pub struct StoreRosterRepository<'store> {
    store: &'store dyn DocumentStore,
}

impl<'store> StoreRosterRepository<'store> {
    pub fn new(store: &'store dyn DocumentStore) -> Self {
        Self { store }
    }
}

impl RosterRepository for StoreRosterRepository<'_> {
    fn load_roster(&self) -> RepoResult<Roster> {
        let documents = self.store.query(
            CATEGORIES_COLLECTION,
            &OrderBy::FieldAsc(CREATED_AT_FIELD.to_string()),
        )?;
        let categories = documents
            .into_iter()
            .map(|doc| category_from_document(doc.id, doc.body))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Roster::new(categories))
    }

    fn add_category(&self, name: &str) -> RepoResult<Category> {
        let name = require_name(name, ValidationError::EmptyCategoryName)?;
        let id = new_category_id();
        let created_at = chrono::Utc::now().timestamp_millis();

        let mut created = None;
        self.store
            .insert_counted(CATEGORIES_COLLECTION, &id, &mut |existing| {
                let category = Category {
                    id: id.clone(),
                    name: name.clone(),
                    color: palette_color(existing).to_string(),
                    people: Vec::new(),
                    created_at,
                };
                let document = category_to_document(&category)?;
                created = Some(category);
                Ok(document)
            })?;
        created.ok_or_else(|| {
            RepoError::Store(StoreError::InvalidData(format!(
                "{CATEGORIES_COLLECTION}/{id} was not built"
            )))
        })
    }

    fn delete_category(&self, category_id: &str) -> RepoResult<()> {
        if !self.store.delete(CATEGORIES_COLLECTION, category_id)? {
            return Err(RepoError::CategoryNotFound(category_id.to_string()));
        }
        Ok(())
    }

    fn add_person(&self, category_id: &str, name: &str) -> RepoResult<Person> {
        let name = require_name(name, ValidationError::EmptyPersonName)?;
        let person = Person {
            id: new_person_id(),
            name,
        };
        let entry = serde_json::to_value(&person).map_err(StoreError::from)?;

        let existed = self
            .store
            .mutate(CATEGORIES_COLLECTION, category_id, &mut |doc| {
                users_mut(doc, category_id)?.push(entry.clone());
                Ok(true)
            })?;
        if !existed {
            return Err(RepoError::CategoryNotFound(category_id.to_string()));
        }
        Ok(person)
    }

    fn delete_person(&self, category_id: &str, person_id: &str) -> RepoResult<()> {
        let mut removed = false;
        let existed = self
            .store
            .mutate(CATEGORIES_COLLECTION, category_id, &mut |doc| {
                let users = users_mut(doc, category_id)?;
                let before = users.len();
                users.retain(|user| user.get("id").and_then(Value::as_str) != Some(person_id));
                removed = users.len() != before;
                Ok(removed)
            })?;

        if !existed {
            return Err(RepoError::CategoryNotFound(category_id.to_string()));
        }
        if !removed {
            return Err(RepoError::PersonNotFound {
                category_id: category_id.to_string(),
                person_id: person_id.to_string(),
            });
        }
        Ok(())
    }
}

fn users_mut<'doc>(doc: &'doc mut Document, category_id: &str) -> StoreResult<&'doc mut Vec<Value>> {
    doc.entry(USERS_FIELD)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| {
            StoreError::InvalidData(format!(
                "{CATEGORIES_COLLECTION}/{category_id}.{USERS_FIELD} must be an array"
            ))
        })
}

fn category_from_document(id: String, body: Document) -> StoreResult<Category> {
    let body: CategoryBody = serde_json::from_value(Value::Object(body)).map_err(|err| {
        StoreError::InvalidData(format!("{CATEGORIES_COLLECTION}/{id}: {err}"))
    })?;
    Ok(Category {
        id,
        name: body.name,
        color: body.color,
        people: body.users,
        created_at: body.created_at,
    })
}

fn category_to_document(category: &Category) -> StoreResult<Document> {
    let body = CategoryBody {
        name: category.name.clone(),
        color: category.color.clone(),
        users: category.people.clone(),
        created_at: category.created_at,
    };
    match serde_json::to_value(body)? {
        Value::Object(document) => Ok(document),
        _ => Err(StoreError::InvalidData(
            "category body did not serialize to an object".to_string(),
        )),
    }
}
