//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `attendance_core` linkage.
//! - Print the current month's stats from the configured database.
//!
//! # Configuration
//! - `ATTENDANCE_DB_PATH`: database file; defaults to a file in the temp dir.
//! - `ATTENDANCE_LOG_DIR` / `ATTENDANCE_LOG_LEVEL`: optional file logging.

use attendance_core::{current_month_key, AttendanceService, LogSettings, SqliteDocumentStore};
use std::path::PathBuf;
use std::process::ExitCode;

const DB_PATH_ENV: &str = "ATTENDANCE_DB_PATH";
const DB_FILE_NAME: &str = "attendance.sqlite3";

fn main() -> ExitCode {
    if let Some(settings) = LogSettings::from_env() {
        if let Err(err) = settings.init() {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("attendance_core ping={}", attendance_core::ping());
    println!("attendance_core version={}", attendance_core::core_version());

    let month = current_month_key();
    println!("month={} label={}", month, month.label());

    let db_path = resolve_db_path();
    let store = match SqliteDocumentStore::open(&db_path) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("failed to open {}: {err}", db_path.display());
            return ExitCode::FAILURE;
        }
    };
    let service = AttendanceService::over_store(&store);
    match service.stats(&month) {
        Ok(stats) => {
            for stat in stats {
                println!(
                    "category={} attended={} total={} percentage={}",
                    stat.name, stat.attended, stat.total, stat.percentage
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("stats failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_db_path() -> PathBuf {
    std::env::var(DB_PATH_ENV)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join(DB_FILE_NAME))
}
