//! Mutation Engine: the single entry point for every state transition.
//!
//! # Responsibility
//! - Gate each mutation on the caller's `Capability` before touching storage.
//! - Delegate roster and ledger writes to their repositories.
//! - Serve read-side projections (stats, breakdown, view) computed fresh per call.
//!
//! # Invariants
//! - A denied or invalid call changes nothing.
//! - No lock is held across calls; consistency comes from the store's
//!   per-document atomic writes (last write wins per field path).
//! - Failures are returned, never swallowed, and never retried here.

use crate::access::{AccessDenied, Capability, Mutation};
use crate::model::attendance::{AttendanceLedger, AttendanceStatus};
use crate::model::month::MonthKey;
use crate::model::roster::{Category, CategoryId, Person, PersonId, Roster};
use crate::model::validation::ValidationError;
use crate::repo::ledger_repo::{LedgerInit, LedgerRepository, StoreLedgerRepository};
use crate::repo::roster_repo::{RosterRepository, StoreRosterRepository};
use crate::repo::RepoError;
use crate::service::stats::{
    attendance_view, project, status_breakdown, CategoryBreakdown, CategoryView, DerivedStat,
};
use crate::store::{DocumentStore, StoreError};
use crate::sync::LedgerSubscription;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type AttendanceResult<T> = Result<T, AttendanceError>;

/// Coarse error class reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StoreUnavailable,
    Unauthorized,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::StoreUnavailable => "store_unavailable",
            Self::Unauthorized => "unauthorized",
        }
    }
}

/// Service-level error for attendance use-cases.
#[derive(Debug)]
pub enum AttendanceError {
    /// Blank or empty required input.
    Validation(ValidationError),
    CategoryNotFound(CategoryId),
    PersonNotFound {
        category_id: CategoryId,
        person_id: PersonId,
    },
    /// Persistence boundary failed; the write was not applied.
    StoreUnavailable(StoreError),
    Unauthorized(AccessDenied),
}

impl AttendanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::CategoryNotFound(_) | Self::PersonNotFound { .. } => ErrorKind::NotFound,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
        }
    }
}

impl Display for AttendanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::PersonNotFound {
                category_id,
                person_id,
            } => write!(f, "person {person_id} not found in category {category_id}"),
            Self::StoreUnavailable(err) => write!(f, "store unavailable: {err}"),
            Self::Unauthorized(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AttendanceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StoreUnavailable(err) => Some(err),
            Self::Unauthorized(err) => Some(err),
            Self::CategoryNotFound(_) | Self::PersonNotFound { .. } => None,
        }
    }
}

impl From<RepoError> for AttendanceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::CategoryNotFound(id) => Self::CategoryNotFound(id),
            RepoError::PersonNotFound {
                category_id,
                person_id,
            } => Self::PersonNotFound {
                category_id,
                person_id,
            },
            RepoError::Store(err) => Self::StoreUnavailable(err),
        }
    }
}

impl From<AccessDenied> for AttendanceError {
    fn from(value: AccessDenied) -> Self {
        Self::Unauthorized(value)
    }
}

/// Use-case service over roster and ledger repositories.
pub struct AttendanceService<R: RosterRepository, L: LedgerRepository> {
    roster_repo: R,
    ledger_repo: L,
}

impl<'store> AttendanceService<StoreRosterRepository<'store>, StoreLedgerRepository<'store>> {
    /// Wires both repositories to one document store.
    pub fn over_store(store: &'store dyn DocumentStore) -> Self {
        Self::new(
            StoreRosterRepository::new(store),
            StoreLedgerRepository::new(store),
        )
    }
}

impl<R: RosterRepository, L: LedgerRepository> AttendanceService<R, L> {
    pub fn new(roster_repo: R, ledger_repo: L) -> Self {
        Self {
            roster_repo,
            ledger_repo,
        }
    }

    /// Loads all categories in creation order.
    pub fn roster(&self) -> AttendanceResult<Roster> {
        Ok(self.roster_repo.load_roster()?)
    }

    /// Loads a month's ledger; empty when never initialized.
    pub fn ledger(&self, month: &MonthKey) -> AttendanceResult<AttendanceLedger> {
        Ok(self.ledger_repo.get(month)?)
    }

    /// Projects per-category stats from the current roster and ledger.
    pub fn stats(&self, month: &MonthKey) -> AttendanceResult<Vec<DerivedStat>> {
        let roster = self.roster()?;
        let ledger = self.ledger(month)?;
        Ok(project(&roster, &ledger))
    }

    pub fn breakdown(&self, month: &MonthKey) -> AttendanceResult<Vec<CategoryBreakdown>> {
        let roster = self.roster()?;
        let ledger = self.ledger(month)?;
        Ok(status_breakdown(&roster, &ledger))
    }

    /// Name-filtered, name-sorted people list for display.
    pub fn view(&self, month: &MonthKey, search: &str) -> AttendanceResult<Vec<CategoryView>> {
        let roster = self.roster()?;
        let ledger = self.ledger(month)?;
        Ok(attendance_view(&roster, &ledger, search))
    }

    /// Opens a live ledger feed for `month`. The caller owns and releases it.
    pub fn subscribe(&self, month: &MonthKey) -> AttendanceResult<LedgerSubscription> {
        Ok(self.ledger_repo.subscribe(month)?)
    }

    pub fn add_category(&self, capability: Capability, name: &str) -> AttendanceResult<Category> {
        run(capability, Mutation::AddCategory, String::new, || {
            self.roster_repo.add_category(name)
        })
        .inspect(|category| {
            info!(
                "event=category_created module=service status=ok category_id={} color={}",
                category.id, category.color
            );
        })
    }

    /// Removes a category with all of its people. Ledger entries are left in place.
    pub fn delete_category(
        &self,
        capability: Capability,
        category_id: &str,
    ) -> AttendanceResult<()> {
        run(
            capability,
            Mutation::DeleteCategory,
            || format!("category_id={category_id}"),
            || self.roster_repo.delete_category(category_id),
        )
    }

    pub fn add_person(
        &self,
        capability: Capability,
        category_id: &str,
        name: &str,
    ) -> AttendanceResult<Person> {
        run(
            capability,
            Mutation::AddPerson,
            || format!("category_id={category_id}"),
            || self.roster_repo.add_person(category_id, name),
        )
    }

    /// Removes one person from the roster. Ledger entries are left in place.
    pub fn delete_person(
        &self,
        capability: Capability,
        category_id: &str,
        person_id: &str,
    ) -> AttendanceResult<()> {
        run(
            capability,
            Mutation::DeletePerson,
            || format!("category_id={category_id} person_id={person_id}"),
            || self.roster_repo.delete_person(category_id, person_id),
        )
    }

    /// Seeds the month from the current roster unless it already exists.
    pub fn initialize_if_absent(
        &self,
        capability: Capability,
        month: &MonthKey,
    ) -> AttendanceResult<LedgerInit> {
        run(
            capability,
            Mutation::InitializeMonth,
            || format!("month={month}"),
            || {
                let roster = self.roster_repo.load_roster()?;
                self.ledger_repo.initialize_if_absent(month, &roster)
            },
        )
    }

    /// Point write of one person's status. Unknown person ids are accepted.
    pub fn set_status(
        &self,
        capability: Capability,
        month: &MonthKey,
        person_id: &str,
        status: AttendanceStatus,
    ) -> AttendanceResult<()> {
        run(
            capability,
            Mutation::SetStatus,
            || format!("month={month} person_id={person_id} status={}", status.code()),
            || self.ledger_repo.set_status(month, person_id, status),
        )
    }

    /// Applies one status to many people in a single atomic write.
    pub fn bulk_set_status(
        &self,
        capability: Capability,
        month: &MonthKey,
        person_ids: &[PersonId],
        status: AttendanceStatus,
    ) -> AttendanceResult<usize> {
        run(
            capability,
            Mutation::BulkSetStatus,
            || {
                format!(
                    "month={month} requested={} status={}",
                    person_ids.len(),
                    status.code()
                )
            },
            || self.ledger_repo.bulk_set_status(month, person_ids, status),
        )
    }

    /// Sets every current roster person to `Absent` for `month`.
    pub fn reset_month(&self, capability: Capability, month: &MonthKey) -> AttendanceResult<usize> {
        run(
            capability,
            Mutation::ResetMonth,
            || format!("month={month}"),
            || {
                let roster = self.roster_repo.load_roster()?;
                self.ledger_repo.reset_month(month, &roster)
            },
        )
    }
}

fn run<T>(
    capability: Capability,
    mutation: Mutation,
    detail: impl FnOnce() -> String,
    op: impl FnOnce() -> Result<T, RepoError>,
) -> AttendanceResult<T> {
    let started_at = Instant::now();
    let detail = detail();
    if let Err(denied) = capability.require(mutation) {
        warn!(
            "event=attendance_mutation module=service status=denied op={} capability={} {}",
            mutation.as_str(),
            capability.as_str(),
            detail
        );
        return Err(denied.into());
    }

    let result = op().map_err(AttendanceError::from);
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!(
            "event=attendance_mutation module=service status=ok op={} capability={} {} duration_ms={}",
            mutation.as_str(),
            capability.as_str(),
            detail,
            duration_ms
        ),
        Err(err) if err.kind() == ErrorKind::StoreUnavailable => error!(
            "event=attendance_mutation module=service status=error op={} error_code={} {} duration_ms={} error={}",
            mutation.as_str(),
            err.kind().as_str(),
            detail,
            duration_ms,
            err
        ),
        Err(err) => warn!(
            "event=attendance_mutation module=service status=rejected op={} error_code={} {} duration_ms={}",
            mutation.as_str(),
            err.kind().as_str(),
            detail,
            duration_ms
        ),
    }
    result
}
