//! FFI use-case API for the admin and kiosk screens.
//!
//! # Responsibility
//! - Expose roster, ledger and stats use-cases to Dart via FRB.
//! - Translate caller capability strings and month keys into core types.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are reported in the envelope `message`, prefixed with the call name.
//! - Every call opens the configured database; no connection outlives a call.

use attendance_core::{
    core_version as core_version_inner, current_month_key, init_logging as init_logging_inner,
    parse_capability, ping as ping_inner, AttendanceResult, AttendanceService, AttendanceStatus,
    Capability, Category, CategoryView, DerivedStat, MonthKey, SqliteDocumentStore,
    StoreLedgerRepository, StoreRosterRepository,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;

const DB_PATH_ENV: &str = "ATTENDANCE_DB_PATH";
const DB_FILE_NAME: &str = "attendance.sqlite3";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

type Service<'store> =
    AttendanceService<StoreRosterRepository<'store>, StoreLedgerRepository<'store>>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Month key and display label for the local current month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthInfo {
    /// `YYYY-MM`.
    pub key: String,
    /// Header label, e.g. `Maret 2025`.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonItem {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryItem {
    pub id: String,
    pub name: String,
    pub color: String,
    pub people: Vec<PersonItem>,
}

/// Roster listing envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterResponse {
    pub ok: bool,
    /// Categories in creation order; empty on failure.
    pub items: Vec<CategoryItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatItem {
    pub category_id: String,
    pub name: String,
    pub color: String,
    pub attended: u32,
    pub total: u32,
    pub percentage: u32,
}

/// Per-category stats envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsResponse {
    pub ok: bool,
    pub month_key: String,
    pub items: Vec<StatItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonStatusItem {
    pub id: String,
    pub name: String,
    /// Status label as persisted, e.g. `Asad Offline`.
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStatusItem {
    pub category_id: String,
    pub name: String,
    pub color: String,
    pub people: Vec<PersonStatusItem>,
}

/// Filtered people-with-status envelope for the attendance screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceViewResponse {
    pub ok: bool,
    pub items: Vec<CategoryStatusItem>,
    pub message: String,
}

/// Generic mutation response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Id of the created category or person.
    pub id: Option<String>,
    /// Number of ledger entries written or seeded.
    pub count: Option<u32>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn done(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: None,
            count: None,
            message: message.into(),
        }
    }

    fn created(message: impl Into<String>, id: String) -> Self {
        Self {
            id: Some(id),
            ..Self::done(message)
        }
    }

    fn counted(message: impl Into<String>, count: usize) -> Self {
        Self {
            count: Some(to_u32(count)),
            ..Self::done(message)
        }
    }

    fn failure(op: &str, err: String) -> Self {
        warn!("event=ffi_call module=ffi status=error op={op}");
        Self {
            ok: false,
            id: None,
            count: None,
            message: format!("{op} failed: {err}"),
        }
    }
}

/// Current month as seen by the device clock.
#[flutter_rust_bridge::frb(sync)]
pub fn current_month() -> MonthInfo {
    let month = current_month_key();
    MonthInfo {
        key: month.as_str().to_string(),
        label: month.label(),
    }
}

/// Lists every category with its people.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn roster_list() -> RosterResponse {
    match with_service(|service| service.roster()) {
        Ok(roster) => {
            let items = roster
                .categories
                .into_iter()
                .map(to_category_item)
                .collect::<Vec<_>>();
            RosterResponse {
                ok: true,
                message: format!("Loaded {} categor(ies).", items.len()),
                items,
            }
        }
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=roster_list");
            RosterResponse {
                ok: false,
                items: Vec::new(),
                message: format!("roster_list failed: {err}"),
            }
        }
    }
}

/// Creates a category. Admin only.
#[flutter_rust_bridge::frb(sync)]
pub fn category_add(capability: String, name: String) -> ActionResponse {
    let result = caller(&capability)
        .and_then(|caller| with_service(|service| service.add_category(caller, &name)));
    match result {
        Ok(category) => ActionResponse::created("Category created.", category.id),
        Err(err) => ActionResponse::failure("category_add", err),
    }
}

/// Deletes a category and its people. Ledger entries are kept. Admin only.
#[flutter_rust_bridge::frb(sync)]
pub fn category_delete(capability: String, category_id: String) -> ActionResponse {
    let result = caller(&capability).and_then(|caller| {
        with_service(|service| service.delete_category(caller, category_id.trim()))
    });
    match result {
        Ok(()) => ActionResponse::done("Category deleted."),
        Err(err) => ActionResponse::failure("category_delete", err),
    }
}

/// Appends a person to a category. Admin only.
#[flutter_rust_bridge::frb(sync)]
pub fn person_add(capability: String, category_id: String, name: String) -> ActionResponse {
    let result = caller(&capability).and_then(|caller| {
        with_service(|service| service.add_person(caller, category_id.trim(), &name))
    });
    match result {
        Ok(person) => ActionResponse::created("Person added.", person.id),
        Err(err) => ActionResponse::failure("person_add", err),
    }
}

/// Removes a person from a category. Ledger entries are kept. Admin only.
#[flutter_rust_bridge::frb(sync)]
pub fn person_delete(capability: String, category_id: String, person_id: String) -> ActionResponse {
    let result = caller(&capability).and_then(|caller| {
        with_service(|service| {
            service.delete_person(caller, category_id.trim(), person_id.trim())
        })
    });
    match result {
        Ok(()) => ActionResponse::done("Person deleted."),
        Err(err) => ActionResponse::failure("person_delete", err),
    }
}

/// Creates the month's ledger from the current roster unless it exists.
///
/// `count` carries the number of entries in the month's ledger.
#[flutter_rust_bridge::frb(sync)]
pub fn attendance_initialize(capability: String, month_key: String) -> ActionResponse {
    let result = caller(&capability).and_then(|caller| {
        let month = month(&month_key)?;
        with_service(|service| service.initialize_if_absent(caller, &month))
    });
    match result {
        Ok(init) if init.created => {
            ActionResponse::counted("Month initialized.", init.ledger.len())
        }
        Ok(init) => ActionResponse::counted("Month already initialized.", init.ledger.len()),
        Err(err) => ActionResponse::failure("attendance_initialize", err),
    }
}

/// Sets one person's status.
///
/// `status` accepts the persisted label (`Asad Offline`) or its code (`offline-attended`).
#[flutter_rust_bridge::frb(sync)]
pub fn attendance_update_status(
    capability: String,
    month_key: String,
    person_id: String,
    status: String,
) -> ActionResponse {
    let result = caller(&capability).and_then(|caller| {
        let month = month(&month_key)?;
        let status = attendance_status(&status)?;
        with_service(|service| service.set_status(caller, &month, &person_id, status))
    });
    match result {
        Ok(()) => ActionResponse::counted("Status updated.", 1),
        Err(err) => ActionResponse::failure("attendance_update_status", err),
    }
}

/// Sets one status for many people in a single write. Admin only.
#[flutter_rust_bridge::frb(sync)]
pub fn attendance_bulk_update_status(
    capability: String,
    month_key: String,
    person_ids: Vec<String>,
    status: String,
) -> ActionResponse {
    let result = caller(&capability).and_then(|caller| {
        let month = month(&month_key)?;
        let status = attendance_status(&status)?;
        with_service(|service| service.bulk_set_status(caller, &month, &person_ids, status))
    });
    match result {
        Ok(count) => ActionResponse::counted(format!("Updated {count} person(s)."), count),
        Err(err) => ActionResponse::failure("attendance_bulk_update_status", err),
    }
}

/// Marks every roster person absent for the month. Admin only.
#[flutter_rust_bridge::frb(sync)]
pub fn attendance_reset(capability: String, month_key: String) -> ActionResponse {
    let result = caller(&capability).and_then(|caller| {
        let month = month(&month_key)?;
        with_service(|service| service.reset_month(caller, &month))
    });
    match result {
        Ok(count) => ActionResponse::counted(format!("Reset {count} person(s)."), count),
        Err(err) => ActionResponse::failure("attendance_reset", err),
    }
}

/// Per-category attendance figures for a month.
#[flutter_rust_bridge::frb(sync)]
pub fn attendance_stats(month_key: String) -> StatsResponse {
    let result = month(&month_key)
        .and_then(|month| with_service(|service| service.stats(&month)).map(|s| (month, s)));
    match result {
        Ok((month, stats)) => StatsResponse {
            ok: true,
            month_key: month.as_str().to_string(),
            message: format!("Computed {} categor(ies).", stats.len()),
            items: stats.into_iter().map(to_stat_item).collect(),
        },
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=attendance_stats");
            StatsResponse {
                ok: false,
                month_key: month_key.trim().to_string(),
                items: Vec::new(),
                message: format!("attendance_stats failed: {err}"),
            }
        }
    }
}

/// People with resolved statuses, filtered by a case-insensitive name search.
#[flutter_rust_bridge::frb(sync)]
pub fn attendance_view(month_key: String, search: String) -> AttendanceViewResponse {
    let result =
        month(&month_key).and_then(|month| with_service(|service| service.view(&month, &search)));
    match result {
        Ok(view) => AttendanceViewResponse {
            ok: true,
            message: if view.is_empty() {
                "No results.".to_string()
            } else {
                format!("Found {} categor(ies).", view.len())
            },
            items: view.into_iter().map(to_category_status_item).collect(),
        },
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=attendance_view");
            AttendanceViewResponse {
                ok: false,
                items: Vec::new(),
                message: format!("attendance_view failed: {err}"),
            }
        }
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_service<T>(
    f: impl FnOnce(&Service<'_>) -> AttendanceResult<T>,
) -> Result<T, String> {
    let store = SqliteDocumentStore::open(resolve_db_path())
        .map_err(|err| format!("database open failed: {err}"))?;
    let service = AttendanceService::over_store(&store);
    f(&service).map_err(|err| format!("[{}] {err}", err.kind().as_str()))
}

fn caller(capability: &str) -> Result<Capability, String> {
    parse_capability(capability).map_err(|err| format!("[unauthorized] {err}"))
}

fn month(month_key: &str) -> Result<MonthKey, String> {
    MonthKey::parse(month_key.trim()).map_err(|err| format!("[validation] {err}"))
}

fn attendance_status(value: &str) -> Result<AttendanceStatus, String> {
    AttendanceStatus::parse(value)
        .ok_or_else(|| format!("[validation] unknown attendance status `{}`", value.trim()))
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn to_category_item(category: Category) -> CategoryItem {
    CategoryItem {
        id: category.id,
        name: category.name,
        color: category.color,
        people: category
            .people
            .into_iter()
            .map(|person| PersonItem {
                id: person.id,
                name: person.name,
            })
            .collect(),
    }
}

fn to_stat_item(stat: DerivedStat) -> StatItem {
    StatItem {
        category_id: stat.category_id,
        name: stat.name,
        color: stat.color,
        attended: to_u32(stat.attended),
        total: to_u32(stat.total),
        percentage: stat.percentage,
    }
}

fn to_category_status_item(view: CategoryView) -> CategoryStatusItem {
    CategoryStatusItem {
        category_id: view.category_id,
        name: view.name,
        color: view.color,
        people: view
            .people
            .into_iter()
            .map(|person| PersonStatusItem {
                id: person.id,
                name: person.name,
                status: person.status.label().to_string(),
            })
            .collect(),
    }
}
