//! Domain model for roster membership and monthly attendance.
//!
//! # Responsibility
//! - Define canonical data structures used by repositories and services.
//! - Keep roster membership independent from any month's attendance.
//!
//! # Invariants
//! - Every person and category is identified by a stable opaque id.
//! - A ledger is named by its `MonthKey`; the key is never duplicated in the body.

pub mod attendance;
pub mod month;
pub mod roster;
pub mod validation;
