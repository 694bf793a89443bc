//! Core domain logic for monthly attendance tracking.
//! This crate is the single source of truth for roster and ledger invariants.

pub mod access;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod sync;

pub use access::{parse_capability, AccessDenied, Capability, CapabilityParseError, Mutation};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::attendance::{AttendanceLedger, AttendanceRecord, AttendanceStatus};
pub use model::month::{current_month_key, MonthKey};
pub use model::roster::{Category, CategoryId, Person, PersonId, Roster};
pub use model::validation::ValidationError;
pub use repo::ledger_repo::{LedgerInit, LedgerRepository, StoreLedgerRepository};
pub use repo::roster_repo::{RosterRepository, StoreRosterRepository};
pub use repo::{RepoError, RepoResult};
pub use service::attendance_service::{
    AttendanceError, AttendanceResult, AttendanceService, ErrorKind,
};
pub use service::stats::{
    attendance_view, project, status_breakdown, CategoryBreakdown, CategoryView, DerivedStat,
    PersonView, StatusCount,
};
pub use store::{DocumentStore, SqliteDocumentStore, StoreError, StoreResult};
pub use sync::{LedgerSubscription, SubscriptionState};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
