//! Attendance use-cases.
//!
//! # Responsibility
//! - `attendance_service`: capability-gated mutations and fresh read projections.
//! - `stats`: pure projections from roster + ledger to display figures.

pub mod attendance_service;
pub mod stats;
