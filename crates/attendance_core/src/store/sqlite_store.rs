//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist JSON documents in the `documents` table, one row per `(collection, id)`.
//! - Run every write inside an IMMEDIATE transaction so field-path updates are
//!   applied against the committed body, never a stale caller copy.
//! - Fan committed snapshots out to document watchers.
//!
//! # Invariants
//! - The connection lock is held from transaction start until watchers are
//!   notified, so snapshot delivery follows commit order.
//! - Lock order is always `conn` then `watchers`.
//! - Watchers only observe writes made through this store instance.
//! - A watch entry with no receivers is dropped on the next write to its
//!   document or the next `subscribe` call, whichever comes first.

use super::{
    apply_field_updates, Document, DocumentBuild, DocumentEdit, DocumentSnapshot, DocumentStore, DocumentWatch,
    FieldUpdate, OrderBy, StoreError, StoreResult, StoredDocument,
};
use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory, DbError};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

type DocKey = (String, String);

pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
    watchers: Mutex<HashMap<DocKey, watch::Sender<DocumentSnapshot>>>,
}

impl SqliteDocumentStore {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `StoreError::Db` when the schema is not at the latest migration.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected = latest_version();
        if actual != expected {
            return Err(StoreError::Db(DbError::UnsupportedSchemaVersion {
                db_version: actual,
                latest_supported: expected,
            }));
        }
        Ok(Self {
            conn: Mutex::new(conn),
            watchers: Mutex::new(HashMap::new()),
        })
    }

    /// Opens (creating when needed) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Number of documents with at least one live watcher.
    pub fn watched_documents(&self) -> StoreResult<usize> {
        let watchers = self.lock_watchers()?;
        Ok(watchers
            .values()
            .filter(|sender| sender.receiver_count() > 0)
            .count())
    }

    fn lock_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Poisoned("connection"))
    }

    fn lock_watchers(
        &self,
    ) -> StoreResult<MutexGuard<'_, HashMap<DocKey, watch::Sender<DocumentSnapshot>>>> {
        self.watchers
            .lock()
            .map_err(|_| StoreError::Poisoned("watchers"))
    }

    /// Runs `apply` in one IMMEDIATE transaction and publishes its snapshot.
    ///
    /// `apply` returns the call result plus `Some(snapshot)` when the document changed.
    fn write<T>(
        &self,
        collection: &str,
        id: &str,
        apply: impl FnOnce(&Transaction<'_>) -> StoreResult<(T, Option<DocumentSnapshot>)>,
    ) -> StoreResult<T> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (result, changed) = apply(&tx)?;
        if let Err(err) = tx.commit() {
            error!(
                "event=store_commit module=store status=error collection={} doc_id={} error={}",
                collection, id, err
            );
            return Err(err.into());
        }
        if let Some(snapshot) = changed {
            // The write is committed; a broken watcher table must not turn it into a failure.
            if let Err(err) = self.publish(collection, id, snapshot) {
                error!(
                    "event=store_publish module=store status=error collection={} doc_id={} error={}",
                    collection, id, err
                );
            }
        }
        drop(conn);
        Ok(result)
    }

    fn publish(&self, collection: &str, id: &str, snapshot: DocumentSnapshot) -> StoreResult<()> {
        let mut watchers = self.lock_watchers()?;
        let key = (collection.to_string(), id.to_string());
        let Some(sender) = watchers.get(&key) else {
            return Ok(());
        };
        if sender.receiver_count() == 0 {
            watchers.remove(&key);
            debug!(
                "event=store_watch_release module=store status=ok collection={} doc_id={}",
                collection, id
            );
            return Ok(());
        }
        sender.send_replace(snapshot);
        Ok(())
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let conn = self.lock_conn()?;
        load_document(&conn, collection, id)
    }

    fn set(&self, collection: &str, id: &str, document: &Document) -> StoreResult<()> {
        self.write(collection, id, |tx| {
            save_document(tx, collection, id, document)?;
            Ok(((), Some(Some(document.clone()))))
        })
    }

    fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        document: &Document,
    ) -> StoreResult<bool> {
        self.write(collection, id, |tx| {
            let body = serde_json::to_string(document)?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO documents (collection, doc_id, body)
                 VALUES (?1, ?2, ?3);",
                params![collection, id, body],
            )?;
            if inserted == 0 {
                return Ok((false, None));
            }
            Ok((true, Some(Some(document.clone()))))
        })
    }

    fn insert_counted(
        &self,
        collection: &str,
        id: &str,
        build: &mut DocumentBuild<'_>,
    ) -> StoreResult<()> {
        self.write(collection, id, |tx| {
            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1;",
                params![collection],
                |row| row.get(0),
            )?;
            let document = build(usize::try_from(existing).unwrap_or_default())?;
            save_document(tx, collection, id, &document)?;
            Ok(((), Some(Some(document))))
        })
    }

    fn update(&self, collection: &str, id: &str, fields: &[FieldUpdate]) -> StoreResult<()> {
        self.write(collection, id, |tx| {
            let mut document = load_document(tx, collection, id)?.unwrap_or_default();
            apply_field_updates(&mut document, fields);
            save_document(tx, collection, id, &document)?;
            Ok(((), Some(Some(document))))
        })
    }

    fn mutate(
        &self,
        collection: &str,
        id: &str,
        edit: &mut DocumentEdit<'_>,
    ) -> StoreResult<bool> {
        self.write(collection, id, |tx| {
            let Some(mut document) = load_document(tx, collection, id)? else {
                return Ok((false, None));
            };
            if !edit(&mut document)? {
                return Ok((true, None));
            }
            save_document(tx, collection, id, &document)?;
            Ok((true, Some(Some(document))))
        })
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.write(collection, id, |tx| {
            let removed = tx.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![collection, id],
            )?;
            if removed == 0 {
                return Ok((false, None));
            }
            Ok((true, Some(None)))
        })
    }

    fn query(&self, collection: &str, order: &OrderBy) -> StoreResult<Vec<StoredDocument>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(match order {
            OrderBy::Insertion => {
                "SELECT doc_id, body FROM documents
                 WHERE collection = ?1
                 ORDER BY rowid ASC;"
            }
            OrderBy::FieldAsc(_) => {
                "SELECT doc_id, body FROM documents
                 WHERE collection = ?1
                 ORDER BY json_extract(body, ?2) ASC, rowid ASC;"
            }
        })?;
        let mut rows = match order {
            OrderBy::Insertion => stmt.query(params![collection])?,
            OrderBy::FieldAsc(field) => stmt.query(params![collection, json_field_path(field)])?,
        };
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let body: String = row.get(1)?;
            documents.push(StoredDocument {
                body: parse_body(collection, &id, &body)?,
                id,
            });
        }
        Ok(documents)
    }

    fn subscribe(&self, collection: &str, id: &str) -> StoreResult<DocumentWatch> {
        // Holding the connection lock keeps the initial snapshot aligned with
        // the commit stream that follows it.
        let conn = self.lock_conn()?;
        let mut watchers = self.lock_watchers()?;
        prune_released(&mut watchers);
        let key = (collection.to_string(), id.to_string());
        if let Some(sender) = watchers.get(&key) {
            return Ok(sender.subscribe());
        }

        let current = load_document(&conn, collection, id)?;
        let (sender, receiver) = watch::channel(current);
        watchers.insert(key, sender);
        debug!(
            "event=store_watch_open module=store status=ok collection={} doc_id={}",
            collection, id
        );
        Ok(receiver)
    }
}

fn prune_released(watchers: &mut HashMap<DocKey, watch::Sender<DocumentSnapshot>>) {
    let before = watchers.len();
    watchers.retain(|_, sender| sender.receiver_count() > 0);
    let released = before - watchers.len();
    if released > 0 {
        debug!(
            "event=store_watch_release module=store status=ok released={}",
            released
        );
    }
}

fn load_document(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2;",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|body| parse_body(collection, id, &body))
        .transpose()
}

fn save_document(
    tx: &Transaction<'_>,
    collection: &str,
    id: &str,
    document: &Document,
) -> StoreResult<()> {
    let body = serde_json::to_string(document)?;
    tx.execute(
        "INSERT INTO documents (collection, doc_id, body)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (collection, doc_id) DO UPDATE SET
            body = excluded.body,
            updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000);",
        params![collection, id, body],
    )?;
    Ok(())
}

fn json_field_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

fn parse_body(collection: &str, id: &str, body: &str) -> StoreResult<Document> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::InvalidData(format!(
            "{collection}/{id} body must be an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
