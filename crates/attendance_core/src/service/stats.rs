//! Stats Projector and view projections.
//!
//! # Responsibility
//! - Derive per-category attendance figures from a roster and a ledger.
//! - Build the filtered, name-sorted people list shown by admin and kiosk views.
//!
//! # Invariants
//! - Every function here is pure: inputs are borrowed immutably, nothing is cached.
//! - Output follows roster category order.
//! - A person without a ledger entry counts as `Absent`; orphan entries are ignored.

use crate::model::attendance::{AttendanceLedger, AttendanceStatus};
use crate::model::roster::{Category, CategoryId, PersonId, Roster};

/// Attendance figures of one category. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedStat {
    pub category_id: CategoryId,
    pub name: String,
    pub color: String,
    /// People whose resolved status is not `Absent`.
    pub attended: usize,
    pub total: usize,
    /// `round(attended / total * 100)`, or `0` for an empty category.
    pub percentage: u32,
}

/// Count of one status within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCount {
    pub status: AttendanceStatus,
    pub count: usize,
    pub percentage: u32,
}

/// Per-status report of one category, statuses in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBreakdown {
    pub category_id: CategoryId,
    pub name: String,
    pub color: String,
    pub total: usize,
    pub counts: Vec<StatusCount>,
}

impl CategoryBreakdown {
    pub fn count_of(&self, status: AttendanceStatus) -> usize {
        self.counts
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}

/// One person row of a view, with resolved status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonView {
    pub id: PersonId,
    pub name: String,
    pub status: AttendanceStatus,
}

/// One category section of a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryView {
    pub category_id: CategoryId,
    pub name: String,
    pub color: String,
    pub people: Vec<PersonView>,
}

/// Rounds `count / total` to a whole percentage, half away from zero.
pub fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = (count as u128 * 200 + total as u128) / (total as u128 * 2);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Projects one `DerivedStat` per category.
pub fn project(roster: &Roster, ledger: &AttendanceLedger) -> Vec<DerivedStat> {
    roster
        .categories
        .iter()
        .map(|category| {
            let total = category.people.len();
            let attended = category
                .people
                .iter()
                .filter(|person| ledger.status_of(&person.id).is_attended())
                .count();
            DerivedStat {
                category_id: category.id.clone(),
                name: category.name.clone(),
                color: category.color.clone(),
                attended,
                total,
                percentage: percentage(attended, total),
            }
        })
        .collect()
}

/// Counts every status per category for the admin report.
pub fn status_breakdown(roster: &Roster, ledger: &AttendanceLedger) -> Vec<CategoryBreakdown> {
    roster
        .categories
        .iter()
        .map(|category| {
            let total = category.people.len();
            let counts = AttendanceStatus::ALL
                .into_iter()
                .map(|status| {
                    let count = category
                        .people
                        .iter()
                        .filter(|person| ledger.status_of(&person.id) == status)
                        .count();
                    StatusCount {
                        status,
                        count,
                        percentage: percentage(count, total),
                    }
                })
                .collect();
            CategoryBreakdown {
                category_id: category.id.clone(),
                name: category.name.clone(),
                color: category.color.clone(),
                total,
                counts,
            }
        })
        .collect()
}

/// Builds the display list: people matching `search` (case-insensitive
/// substring), sorted by name, each with its resolved status.
///
/// With a non-blank search, categories with no match are dropped.
pub fn attendance_view(
    roster: &Roster,
    ledger: &AttendanceLedger,
    search: &str,
) -> Vec<CategoryView> {
    let needle = search.trim().to_lowercase();
    roster
        .categories
        .iter()
        .map(|category| category_view(category, ledger, &needle))
        .filter(|view| needle.is_empty() || !view.people.is_empty())
        .collect()
}

fn category_view(category: &Category, ledger: &AttendanceLedger, needle: &str) -> CategoryView {
    let mut people = category
        .people
        .iter()
        .filter(|person| needle.is_empty() || person.name.to_lowercase().contains(needle))
        .map(|person| PersonView {
            id: person.id.clone(),
            name: person.name.clone(),
            status: ledger.status_of(&person.id),
        })
        .collect::<Vec<_>>();
    people.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    CategoryView {
        category_id: category.id.clone(),
        name: category.name.clone(),
        color: category.color.clone(),
        people,
    }
}

#[cfg(test)]
mod tests {
    use super::{attendance_view, percentage, project, status_breakdown};
    use crate::model::attendance::{AttendanceLedger, AttendanceRecord, AttendanceStatus};
    use crate::model::month::MonthKey;
    use crate::model::roster::{Category, Person, Roster};

    fn category(id: &str, name: &str, people: &[(&str, &str)]) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            color: "#1abc9c".to_string(),
            people: people
                .iter()
                .map(|(person_id, person_name)| Person {
                    id: person_id.to_string(),
                    name: person_name.to_string(),
                })
                .collect(),
            created_at: 0,
        }
    }

    fn ledger(entries: &[(&str, AttendanceStatus)]) -> AttendanceLedger {
        let mut ledger = AttendanceLedger::empty(MonthKey::parse("2025-03").unwrap());
        for (person_id, status) in entries {
            ledger
                .entries
                .insert(person_id.to_string(), AttendanceRecord::new(*status));
        }
        ledger
    }

    #[test]
    fn percentage_rounds_half_up_and_handles_empty() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(3, 3), 100);
    }

    #[test]
    fn project_counts_non_absent_people_per_category() {
        let roster = Roster::new(vec![
            category("a", "A", &[("u1", "One"), ("u2", "Two")]),
            category("b", "B", &[]),
        ]);
        let ledger = ledger(&[
            ("u1", AttendanceStatus::Absent),
            ("u2", AttendanceStatus::OfflineAttended),
        ]);

        let stats = project(&roster, &ledger);
        assert_eq!(stats.len(), 2);
        assert_eq!(
            (stats[0].name.as_str(), stats[0].attended, stats[0].total, stats[0].percentage),
            ("A", 1, 2, 50)
        );
        assert_eq!(
            (stats[1].name.as_str(), stats[1].attended, stats[1].total, stats[1].percentage),
            ("B", 0, 0, 0)
        );
    }

    #[test]
    fn project_ignores_orphans_and_defaults_missing_to_absent() {
        let roster = Roster::new(vec![category("a", "A", &[("u1", "One"), ("u2", "Two")])]);
        let ledger = ledger(&[
            ("u1", AttendanceStatus::PrayerOnly),
            ("ghost", AttendanceStatus::OfflineAttended),
        ]);
        let stats = project(&roster, &ledger);
        assert_eq!(stats[0].attended, 1);
        assert_eq!(stats[0].total, 2);
    }

    #[test]
    fn breakdown_counts_every_status() {
        let roster = Roster::new(vec![category(
            "a",
            "A",
            &[("u1", "One"), ("u2", "Two"), ("u3", "Three"), ("u4", "Four")],
        )]);
        let ledger = ledger(&[
            ("u1", AttendanceStatus::OfflineAttended),
            ("u2", AttendanceStatus::OfflineAttended),
            ("u3", AttendanceStatus::PrayerOnly),
        ]);
        let breakdown = status_breakdown(&roster, &ledger);
        let report = &breakdown[0];
        assert_eq!(report.total, 4);
        assert_eq!(report.count_of(AttendanceStatus::OfflineAttended), 2);
        assert_eq!(report.count_of(AttendanceStatus::IndependentAttended), 0);
        assert_eq!(report.count_of(AttendanceStatus::PrayerOnly), 1);
        assert_eq!(report.count_of(AttendanceStatus::Absent), 1);
        assert_eq!(report.counts[0].percentage, 50);
    }

    #[test]
    fn view_filters_case_insensitively_and_sorts_by_name() {
        let roster = Roster::new(vec![
            category("a", "A", &[("u1", "zainab"), ("u2", "Ali"), ("u3", "aisyah")]),
            category("b", "B", &[("u4", "Budi")]),
        ]);
        let ledger = ledger(&[("u2", AttendanceStatus::PrayerOnly)]);

        let all = attendance_view(&roster, &ledger, "  ");
        assert_eq!(all.len(), 2);
        let names: Vec<_> = all[0].people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["aisyah", "Ali", "zainab"]);
        assert_eq!(all[0].people[1].status, AttendanceStatus::PrayerOnly);

        let filtered = attendance_view(&roster, &ledger, "AI");
        assert_eq!(filtered.len(), 1);
        let names: Vec<_> = filtered[0].people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["aisyah", "zainab"]);
    }

    #[test]
    fn view_never_mutates_inputs() {
        let roster = Roster::new(vec![category("a", "A", &[("u2", "Zed"), ("u1", "Ann")])]);
        let ledger = ledger(&[]);
        let roster_before = roster.clone();
        let ledger_before = ledger.clone();

        let _ = attendance_view(&roster, &ledger, "zzz");
        assert_eq!(roster, roster_before);
        assert_eq!(ledger, ledger_before);
    }
}
