//! Flutter-facing bindings over `attendance_core`.

pub mod api;
