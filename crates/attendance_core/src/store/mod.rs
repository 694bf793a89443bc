//! Document persistence boundary.
//!
//! # Responsibility
//! - Define the document-oriented store contract the repositories consume.
//! - Define dotted field-path upsert semantics shared by every implementation.
//!
//! # Invariants
//! - Every write method commits as one atomic step; readers never observe a
//!   partially applied `update`.
//! - Watchers receive committed snapshots in commit order. A snapshot is the
//!   whole document (`None` once deleted), never a diff.
//! - `update` is an upsert: a missing document is created from its field paths.

use crate::db::DbError;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::watch;

mod sqlite_store;

pub use sqlite_store::SqliteDocumentStore;

/// JSON object body of one document.
pub type Document = serde_json::Map<String, Value>;

/// Committed state of one document; `None` when it does not exist.
pub type DocumentSnapshot = Option<Document>;

/// Live view of one document. Holds the latest committed snapshot.
pub type DocumentWatch = watch::Receiver<DocumentSnapshot>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Backing database failed.
    Db(DbError),
    /// Persisted body is not a valid document for its collection.
    InvalidData(String),
    /// A writer panicked while holding the store lock.
    Poisoned(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
            Self::Poisoned(what) => write!(f, "document store {what} lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::Poisoned(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Nested field address inside a document, e.g. `user_1.status`.
///
/// Segments are kept separate so ids containing `.` stay addressable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// One field-path assignment of an `update` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub path: FieldPath,
    pub value: Value,
}

impl FieldUpdate {
    pub fn new(path: FieldPath, value: Value) -> Self {
        Self { path, value }
    }
}

/// Document plus its id, as returned by `query`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub body: Document,
}

/// Result ordering for `query`. Ties always fall back to insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    Insertion,
    /// Ascending by a top-level field.
    FieldAsc(String),
}

/// Edit callback for `DocumentStore::mutate`; returns whether it changed the body.
pub type DocumentEdit<'a> = dyn FnMut(&mut Document) -> StoreResult<bool> + 'a;

/// Builder for `DocumentStore::insert_counted`; receives the collection's size before the insert.
pub type DocumentBuild<'a> = dyn FnMut(usize) -> StoreResult<Document> + 'a;

/// Document-oriented persistence boundary.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Replaces the whole document.
    fn set(&self, collection: &str, id: &str, document: &Document) -> StoreResult<()>;

    /// Inserts the document only when missing. Returns whether it was created.
    fn create_if_absent(&self, collection: &str, id: &str, document: &Document)
        -> StoreResult<bool>;

    /// Counts the collection and writes `build(count)` under `id` in one write.
    fn insert_counted(
        &self,
        collection: &str,
        id: &str,
        build: &mut DocumentBuild<'_>,
    ) -> StoreResult<()>;

    /// Upserts every field path in one atomic write, leaving other fields untouched.
    fn update(&self, collection: &str, id: &str, fields: &[FieldUpdate]) -> StoreResult<()>;

    /// Runs `edit` against the current body inside one write transaction.
    ///
    /// Returns `false` without calling `edit` when the document is missing.
    /// Nothing is written when `edit` reports no change or fails.
    fn mutate(&self, collection: &str, id: &str, edit: &mut DocumentEdit<'_>) -> StoreResult<bool>;

    /// Returns whether a document was removed.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    fn query(&self, collection: &str, order: &OrderBy) -> StoreResult<Vec<StoredDocument>>;

    /// Opens a live view whose initial value is the current snapshot.
    fn subscribe(&self, collection: &str, id: &str) -> StoreResult<DocumentWatch>;
}

/// Applies field-path assignments in order. Non-object intermediates are replaced.
pub fn apply_field_updates(document: &mut Document, fields: &[FieldUpdate]) {
    for field in fields {
        set_path(document, field.path.segments(), field.value.clone());
    }
}

fn set_path(target: &mut Document, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let slot = target
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Document::new()));
            if !slot.is_object() {
                *slot = Value::Object(Document::new());
            }
            if let Value::Object(child) = slot {
                set_path(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_field_updates, Document, FieldPath, FieldUpdate};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn field_update_touches_only_its_path() {
        let mut body = doc(json!({
            "u1": {"status": "Belum Asad"},
            "u2": {"status": "Doa"}
        }));
        apply_field_updates(
            &mut body,
            &[FieldUpdate::new(
                FieldPath::new(["u1", "status"]),
                json!("Asad Offline"),
            )],
        );
        assert_eq!(
            Value::Object(body),
            json!({
                "u1": {"status": "Asad Offline"},
                "u2": {"status": "Doa"}
            })
        );
    }

    #[test]
    fn field_update_creates_missing_parents_and_replaces_scalars() {
        let mut body = doc(json!({"u3": "legacy"}));
        apply_field_updates(
            &mut body,
            &[
                FieldUpdate::new(FieldPath::new(["u9", "status"]), json!("Doa")),
                FieldUpdate::new(FieldPath::new(["u3", "status"]), json!("Doa")),
            ],
        );
        assert_eq!(body["u9"]["status"], json!("Doa"));
        assert_eq!(body["u3"]["status"], json!("Doa"));
    }

    #[test]
    fn field_path_keeps_dotted_segments_intact() {
        let path = FieldPath::new(["a.b", "status"]);
        assert_eq!(path.segments().len(), 2);
        assert_eq!(path.to_string(), "a.b.status");

        let mut body = Document::new();
        apply_field_updates(&mut body, &[FieldUpdate::new(path, json!(1))]);
        assert_eq!(body["a.b"]["status"], json!(1));
    }
}
