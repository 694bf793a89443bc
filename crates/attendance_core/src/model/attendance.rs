//! Attendance ledger model.
//!
//! # Responsibility
//! - Define the fixed status enumeration and its persisted labels.
//! - Hold one month's person-id -> status mapping.
//!
//! # Invariants
//! - A person without an entry resolves to `AttendanceStatus::Absent`.
//! - Entries for ids unknown to the roster (orphans) are kept, never an error.

use crate::model::month::MonthKey;
use crate::model::roster::{PersonId, Roster};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Per-person monthly status. Exactly one applies per person per month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// Attended in person.
    #[serde(rename = "Asad Offline")]
    OfflineAttended,
    /// Attended independently.
    #[serde(rename = "Asad Mandiri")]
    IndependentAttended,
    /// Joined the prayer only.
    #[serde(rename = "Doa")]
    PrayerOnly,
    /// Not attended yet.
    #[default]
    #[serde(rename = "Belum Asad")]
    Absent,
}

impl AttendanceStatus {
    /// Display order used by badges and report panels.
    pub const ALL: [AttendanceStatus; 4] = [
        Self::OfflineAttended,
        Self::IndependentAttended,
        Self::PrayerOnly,
        Self::Absent,
    ];

    /// Persisted label.
    pub fn label(self) -> &'static str {
        match self {
            Self::OfflineAttended => "Asad Offline",
            Self::IndependentAttended => "Asad Mandiri",
            Self::PrayerOnly => "Doa",
            Self::Absent => "Belum Asad",
        }
    }

    /// Parses a persisted label or the kebab-case status name.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL.into_iter().find(|status| {
            status.label() == trimmed || status.code().eq_ignore_ascii_case(trimmed)
        })
    }

    /// Stable kebab-case name, used by API callers.
    pub fn code(self) -> &'static str {
        match self {
            Self::OfflineAttended => "offline-attended",
            Self::IndependentAttended => "independent-attended",
            Self::PrayerOnly => "prayer-only",
            Self::Absent => "absent",
        }
    }

    pub fn is_attended(self) -> bool {
        self != Self::Absent
    }
}

impl Display for AttendanceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn new(status: AttendanceStatus) -> Self {
        Self { status }
    }
}

/// One month's attendance, keyed by person id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceLedger {
    pub month_key: MonthKey,
    pub entries: BTreeMap<PersonId, AttendanceRecord>,
}

impl AttendanceLedger {
    /// Empty ledger for a month that has never been initialized.
    pub fn empty(month_key: MonthKey) -> Self {
        Self {
            month_key,
            entries: BTreeMap::new(),
        }
    }

    /// Ledger seeded with `Absent` for every person in `roster`.
    pub fn seeded(month_key: MonthKey, roster: &Roster) -> Self {
        let entries = roster
            .people()
            .map(|person| (person.id.clone(), AttendanceRecord::default()))
            .collect();
        Self { month_key, entries }
    }

    /// Resolved status: the entry when present, else `Absent`.
    pub fn status_of(&self, person_id: &str) -> AttendanceStatus {
        self.entries
            .get(person_id)
            .map(|record| record.status)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry ids that no longer exist in `roster`.
    pub fn orphans(&self, roster: &Roster) -> Vec<PersonId> {
        self.entries
            .keys()
            .filter(|person_id| !roster.contains_person(person_id))
            .cloned()
            .collect()
    }

    /// Roster people that have no entry yet.
    pub fn missing(&self, roster: &Roster) -> Vec<PersonId> {
        roster
            .people()
            .filter(|person| !self.entries.contains_key(&person.id))
            .map(|person| person.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{AttendanceLedger, AttendanceRecord, AttendanceStatus};
    use crate::model::month::MonthKey;
    use crate::model::roster::{Category, Person, Roster};

    fn roster_with(ids: &[&str]) -> Roster {
        Roster::new(vec![Category {
            id: "cat_a".to_string(),
            name: "A".to_string(),
            color: "#1abc9c".to_string(),
            people: ids
                .iter()
                .map(|id| Person {
                    id: id.to_string(),
                    name: id.to_string(),
                })
                .collect(),
            created_at: 1,
        }])
    }

    #[test]
    fn status_serializes_to_persisted_labels() {
        let json = serde_json::to_string(&AttendanceRecord::new(AttendanceStatus::PrayerOnly))
            .expect("serialize record");
        assert_eq!(json, r#"{"status":"Doa"}"#);

        let parsed: AttendanceRecord =
            serde_json::from_str(r#"{"status":"Asad Mandiri"}"#).expect("parse record");
        assert_eq!(parsed.status, AttendanceStatus::IndependentAttended);
    }

    #[test]
    fn unknown_status_label_is_rejected() {
        let parsed = serde_json::from_str::<AttendanceRecord>(r#"{"status":"Hadir"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn parse_accepts_label_and_code() {
        assert_eq!(
            AttendanceStatus::parse("Belum Asad"),
            Some(AttendanceStatus::Absent)
        );
        assert_eq!(
            AttendanceStatus::parse("Offline-Attended"),
            Some(AttendanceStatus::OfflineAttended)
        );
        assert_eq!(AttendanceStatus::parse("late"), None);
    }

    #[test]
    fn missing_entry_resolves_to_absent() {
        let ledger = AttendanceLedger::empty(MonthKey::parse("2025-03").unwrap());
        assert_eq!(ledger.status_of("nobody"), AttendanceStatus::Absent);
        assert!(!AttendanceStatus::Absent.is_attended());
        assert!(AttendanceStatus::PrayerOnly.is_attended());
    }

    #[test]
    fn staleness_reports_orphans_and_missing_people() {
        let month = MonthKey::parse("2025-03").unwrap();
        let mut ledger = AttendanceLedger::seeded(month, &roster_with(&["u1", "u2"]));
        assert_eq!(ledger.len(), 2);

        ledger.entries.insert(
            "u9".to_string(),
            AttendanceRecord::new(AttendanceStatus::PrayerOnly),
        );
        let current = roster_with(&["u1", "u3"]);
        assert_eq!(ledger.orphans(&current), vec!["u2", "u9"]);
        assert_eq!(ledger.missing(&current), vec!["u3"]);
    }
}
