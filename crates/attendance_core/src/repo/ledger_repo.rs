//! Attendance Ledger: one `attendance` document per month key.
//!
//! # Responsibility
//! - Read a month's person-id -> status mapping.
//! - Issue every status change as a single field-path `update`, so concurrent
//!   editors of different people never clobber each other.
//!
//! # Invariants
//! - `initialize_if_absent` never overwrites an existing ledger.
//! - `bulk_set_status` and `reset_month` are one atomic store write each.
//! - `reset_month` covers the roster's current people only; orphan entries stay.
//! - Unknown person ids are accepted by every write.

use crate::model::attendance::{AttendanceLedger, AttendanceRecord, AttendanceStatus};
use crate::model::month::MonthKey;
use crate::model::roster::{PersonId, Roster};
use crate::model::validation::ValidationError;
use crate::repo::RepoResult;
use crate::store::{Document, DocumentStore, FieldPath, FieldUpdate, StoreError, StoreResult};
use crate::sync::LedgerSubscription;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Collection holding one document per month key.
pub const ATTENDANCE_COLLECTION: &str = "attendance";

const STATUS_FIELD: &str = "status";

/// Outcome of `initialize_if_absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerInit {
    pub ledger: AttendanceLedger,
    /// `false` when the month already existed and was left untouched.
    pub created: bool,
}

/// Repository interface for monthly attendance.
pub trait LedgerRepository {
    /// Returns the month's ledger; empty when never initialized.
    fn get(&self, month: &MonthKey) -> RepoResult<AttendanceLedger>;
    /// Seeds `Absent` for every roster person when the month has no ledger yet.
    fn initialize_if_absent(&self, month: &MonthKey, roster: &Roster) -> RepoResult<LedgerInit>;
    fn set_status(
        &self,
        month: &MonthKey,
        person_id: &str,
        status: AttendanceStatus,
    ) -> RepoResult<()>;
    /// Applies `status` to every id in one write. Returns the number of distinct ids.
    fn bulk_set_status(
        &self,
        month: &MonthKey,
        person_ids: &[PersonId],
        status: AttendanceStatus,
    ) -> RepoResult<usize>;
    /// Sets every current roster person to `Absent`. Returns the number reset.
    fn reset_month(&self, month: &MonthKey, roster: &Roster) -> RepoResult<usize>;
    /// Opens a live feed of the month's ledger.
    fn subscribe(&self, month: &MonthKey) -> RepoResult<LedgerSubscription>;
}

/// Ledger repository backed by a `DocumentStore`.
pub struct StoreLedgerRepository<'store> {
    store: &'store dyn DocumentStore,
}

impl<'store> StoreLedgerRepository<'store> {
    pub fn new(store: &'store dyn DocumentStore) -> Self {
        Self { store }
    }

    fn write_statuses<'a>(
        &self,
        month: &MonthKey,
        person_ids: impl IntoIterator<Item = &'a str>,
        status: AttendanceStatus,
    ) -> StoreResult<()> {
        let fields = person_ids
            .into_iter()
            .map(|person_id| status_field(person_id, status))
            .collect::<Vec<_>>();
        self.store
            .update(ATTENDANCE_COLLECTION, month.as_str(), &fields)
    }
}

impl LedgerRepository for StoreLedgerRepository<'_> {
    fn get(&self, month: &MonthKey) -> RepoResult<AttendanceLedger> {
        let document = self.store.get(ATTENDANCE_COLLECTION, month.as_str())?;
        Ok(ledger_from_snapshot(month, document.as_ref())?)
    }

    fn initialize_if_absent(&self, month: &MonthKey, roster: &Roster) -> RepoResult<LedgerInit> {
        let seeded = AttendanceLedger::seeded(month.clone(), roster);
        let created = self.store.create_if_absent(
            ATTENDANCE_COLLECTION,
            month.as_str(),
            &ledger_to_document(&seeded)?,
        )?;
        if created {
            return Ok(LedgerInit {
                ledger: seeded,
                created,
            });
        }
        Ok(LedgerInit {
            ledger: self.get(month)?,
            created,
        })
    }

    fn set_status(
        &self,
        month: &MonthKey,
        person_id: &str,
        status: AttendanceStatus,
    ) -> RepoResult<()> {
        let person_id = require_person_id(person_id)?;
        self.write_statuses(month, [person_id], status)?;
        Ok(())
    }

    fn bulk_set_status(
        &self,
        month: &MonthKey,
        person_ids: &[PersonId],
        status: AttendanceStatus,
    ) -> RepoResult<usize> {
        if person_ids.is_empty() {
            return Err(ValidationError::EmptyBulkSelection.into());
        }
        let distinct = person_ids
            .iter()
            .map(|person_id| require_person_id(person_id))
            .collect::<Result<BTreeSet<_>, _>>()?;

        self.write_statuses(month, distinct.iter().copied(), status)?;
        Ok(distinct.len())
    }

    fn reset_month(&self, month: &MonthKey, roster: &Roster) -> RepoResult<usize> {
        let person_ids = roster
            .people()
            .map(|person| person.id.as_str())
            .collect::<BTreeSet<_>>();
        self.write_statuses(month, person_ids.iter().copied(), AttendanceStatus::Absent)?;
        Ok(person_ids.len())
    }

    fn subscribe(&self, month: &MonthKey) -> RepoResult<LedgerSubscription> {
        let watch = self.store.subscribe(ATTENDANCE_COLLECTION, month.as_str())?;
        Ok(LedgerSubscription::new(month.clone(), watch))
    }
}

/// Rejects blank ids. Non-blank ids are opaque and written exactly as given.
fn require_person_id(person_id: &str) -> Result<&str, ValidationError> {
    if person_id.trim().is_empty() {
        return Err(ValidationError::EmptyPersonId);
    }
    Ok(person_id)
}

fn status_field(person_id: &str, status: AttendanceStatus) -> FieldUpdate {
    FieldUpdate::new(
        FieldPath::new([person_id, STATUS_FIELD]),
        Value::String(status.label().to_string()),
    )
}

/// Decodes a ledger document; a missing document is an empty ledger.
pub(crate) fn ledger_from_snapshot(
    month: &MonthKey,
    document: Option<&Document>,
) -> StoreResult<AttendanceLedger> {
    let Some(document) = document else {
        return Ok(AttendanceLedger::empty(month.clone()));
    };
    let entries: BTreeMap<PersonId, AttendanceRecord> =
        serde_json::from_value(Value::Object(document.clone())).map_err(|err| {
            StoreError::InvalidData(format!("{ATTENDANCE_COLLECTION}/{month}: {err}"))
        })?;
    Ok(AttendanceLedger {
        month_key: month.clone(),
        entries,
    })
}

fn ledger_to_document(ledger: &AttendanceLedger) -> StoreResult<Document> {
    ledger
        .entries
        .iter()
        .map(|(person_id, record)| -> StoreResult<(String, Value)> {
            Ok((person_id.clone(), serde_json::to_value(record)?))
        })
        .collect()
}
