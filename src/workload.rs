//! Owner-facing panels: workload table, owner focus, coverage suggestions
//! and the per-category response playbook.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{EnrichedCase, UNASSIGNED};
use crate::views::{active, by_score_desc, percent};

pub const OWNER_FOCUS_LIMIT: usize = 4;
pub const OWNER_FOCUS_CASES: usize = 2;
pub const COVERAGE_LIMIT: usize = 4;
pub const PLAYBOOK_CATEGORIES: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerLoad {
    pub owner: String,
    pub total: usize,
    pub overdue: usize,
    pub touch_overdue: usize,
    pub high_urgency: usize,
}

impl OwnerLoad {
    fn count(&mut self, item: &EnrichedCase) {
        self.total += 1;
        self.overdue += usize::from(item.overdue);
        self.touch_overdue += usize::from(item.touch_overdue);
        self.high_urgency += usize::from(item.is_high_urgency());
    }
}

/// Active cases per owner. The unassigned row always leads.
pub fn owner_workload(cases: &[EnrichedCase]) -> Vec<OwnerLoad> {
    let mut rows: BTreeMap<&str, OwnerLoad> = BTreeMap::new();
    for item in active(cases) {
        let owner = item.record.owner_label();
        rows.entry(owner)
            .or_insert_with(|| OwnerLoad {
                owner: owner.to_string(),
                ..OwnerLoad::default()
            })
            .count(item);
    }

    let mut rows: Vec<OwnerLoad> = rows.into_values().collect();
    rows.sort_by(|a, b| {
        (b.owner == UNASSIGNED)
            .cmp(&(a.owner == UNASSIGNED))
            .then_with(|| b.total.cmp(&a.total))
            .then_with(|| a.owner.cmp(&b.owner))
    });
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerFocus<'a> {
    #[serde(flatten)]
    pub load: OwnerLoad,
    pub top_cases: Vec<&'a EnrichedCase>,
}

pub fn owner_focus(cases: &[EnrichedCase], limit: usize) -> Vec<OwnerFocus<'_>> {
    let mut grouped: BTreeMap<&str, Vec<&EnrichedCase>> = BTreeMap::new();
    for item in active(cases) {
        if let Some(owner) = item.record.owner.as_deref() {
            grouped.entry(owner).or_default().push(item);
        }
    }

    let mut focus: Vec<OwnerFocus<'_>> = grouped
        .into_iter()
        .map(|(owner, items)| {
            let mut load = OwnerLoad {
                owner: owner.to_string(),
                ..OwnerLoad::default()
            };
            for item in &items {
                load.count(item);
            }
            let mut top_cases = by_score_desc(items);
            top_cases.truncate(OWNER_FOCUS_CASES);
            OwnerFocus { load, top_cases }
        })
        .collect();

    focus.sort_by_key(|entry| {
        (
            Reverse(entry.load.total),
            Reverse(entry.load.overdue),
            Reverse(entry.load.touch_overdue),
            entry.load.owner.clone(),
        )
    });
    focus.truncate(limit);
    focus
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSuggestion<'a> {
    #[serde(rename = "case")]
    pub item: &'a EnrichedCase,
    pub owner: String,
    /// The owner's active load before this assignment.
    pub current_load: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "suggestions", rename_all = "camelCase")]
pub enum Coverage<'a> {
    Suggestions(Vec<CoverageSuggestion<'a>>),
    NoUnassigned,
    NoOwners,
}

impl Coverage<'_> {
    pub fn empty_reason(&self) -> Option<&'static str> {
        match self {
            Coverage::Suggestions(_) => None,
            Coverage::NoUnassigned => Some("All active cases have owners."),
            Coverage::NoOwners => Some("No owners on record yet; assign an owner to start balancing."),
        }
    }
}

/// Greedy load balancing: each of the top unassigned cases goes to the
/// currently least-loaded known owner, alphabetical on ties.
pub fn coverage_suggestions(cases: &[EnrichedCase], limit: usize) -> Coverage<'_> {
    let unassigned = by_score_desc(active(cases).filter(|item| item.is_unassigned()).collect());
    if unassigned.is_empty() {
        return Coverage::NoUnassigned;
    }

    let mut loads: BTreeMap<&str, usize> = BTreeMap::new();
    for item in cases {
        if let Some(owner) = item.record.owner.as_deref() {
            *loads.entry(owner).or_insert(0) += usize::from(item.is_active());
        }
    }
    if loads.is_empty() {
        return Coverage::NoOwners;
    }

    let mut suggestions = Vec::new();
    for item in unassigned.into_iter().take(limit) {
        let Some((owner, load)) = loads.iter_mut().min_by_key(|(_, load)| **load) else {
            break;
        };
        suggestions.push(CoverageSuggestion {
            item,
            owner: owner.to_string(),
            current_load: *load,
        });
        *load += 1;
    }
    Coverage::Suggestions(suggestions)
}

pub struct Playbook {
    pub lead: &'static str,
    pub steps: [&'static str; 3],
}

pub fn playbook_for(category: &str) -> Playbook {
    match category {
        "Financial aid" => Playbook {
            lead: "Financial aid advisor",
            steps: [
                "Confirm the outstanding balance with the bursar.",
                "Share payment plan or emergency grant options.",
                "Log the agreed payment date in the case.",
            ],
        },
        "Wellbeing" => Playbook {
            lead: "Care partner liaison",
            steps: [
                "Check in with the scholar within 24 hours.",
                "Connect the scholar to campus or community resources.",
                "Document the safety plan and follow-up date.",
            ],
        },
        "Technology access" => Playbook {
            lead: "Technology coordinator",
            steps: [
                "Confirm device or connectivity need.",
                "Arrange a loaner or repair appointment.",
                "Verify the scholar is back online.",
            ],
        },
        "Academic support" => Playbook {
            lead: "Academic coach",
            steps: [
                "Review attendance and grade signals.",
                "Schedule a reset call with the scholar.",
                "Agree on a tutoring or study plan.",
            ],
        },
        "Program operations" => Playbook {
            lead: "Program operations lead",
            steps: [
                "Confirm the program timeline or payout date.",
                "Loop in the responsible partner team.",
                "Send the scholar a written update.",
            ],
        },
        _ => Playbook {
            lead: "Case owner",
            steps: [
                "Clarify the scholar's request.",
                "Agree on an owner and next step.",
                "Confirm resolution with the scholar.",
            ],
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybookEntry {
    pub category: String,
    pub lead: &'static str,
    pub steps: [&'static str; 3],
    pub active: usize,
    pub high_urgency_pct: u32,
}

pub fn response_playbook(cases: &[EnrichedCase]) -> Vec<PlaybookEntry> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for item in active(cases) {
        let entry = counts.entry(item.record.category.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += usize::from(item.is_high_urgency());
    }

    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by_key(|(_, (total, _))| Reverse(*total));
    ranked
        .into_iter()
        .take(PLAYBOOK_CATEGORIES)
        .map(|(category, (total, high))| {
            let playbook = playbook_for(category);
            PlaybookEntry {
                category: category.to_string(),
                lead: playbook.lead,
                steps: playbook.steps,
                active: total,
                high_urgency_pct: percent(high, total),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseRecord, Status, Urgency};
    use crate::priority::enrich;
    use crate::priority::tests::{days, sample_case, today};

    fn case(scholar: &str, owner: Option<&str>, urgency: Urgency, status: Status) -> CaseRecord {
        let mut record = sample_case(urgency, status);
        record.scholar = scholar.to_string();
        record.owner = owner.map(str::to_string);
        record
    }

    #[test]
    fn workload_puts_unassigned_first_then_by_total() {
        let cases = enrich(
            &[
                case("A", Some("Nia"), Urgency::Low, Status::Open),
                case("B", Some("Maya"), Urgency::High, Status::Open),
                case("C", Some("Maya"), Urgency::Low, Status::Pending),
                case("D", None, Urgency::Low, Status::Open),
                case("E", Some("Jordan"), Urgency::Low, Status::Open),
                case("F", Some("Zed"), Urgency::Low, Status::Resolved),
            ],
            today(),
        );
        let rows = owner_workload(&cases);
        let order: Vec<_> = rows.iter().map(|row| (row.owner.as_str(), row.total)).collect();
        assert_eq!(
            order,
            [("Unassigned", 1), ("Maya", 2), ("Jordan", 1), ("Nia", 1)]
        );
        assert_eq!(rows[1].high_urgency, 1);
    }

    #[test]
    fn coverage_breaks_ties_alphabetically_and_rebalances() {
        let mut urgent = case("Urgent", None, Urgency::Critical, Status::Open);
        urgent.due = Some(days(-1));
        let cases = enrich(
            &[
                case("A1", Some("Bea"), Urgency::Low, Status::Open),
                case("A2", Some("Bea"), Urgency::Low, Status::Open),
                case("B1", Some("Ada"), Urgency::Low, Status::Open),
                case("B2", Some("Ada"), Urgency::Low, Status::Open),
                urgent,
                case("Later", None, Urgency::Low, Status::Open),
            ],
            today(),
        );

        let Coverage::Suggestions(suggestions) = coverage_suggestions(&cases, COVERAGE_LIMIT) else {
            panic!("expected suggestions");
        };
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].item.record.scholar, "Urgent");
        assert_eq!(suggestions[0].owner, "Ada");
        assert_eq!(suggestions[0].current_load, 2);
        assert_eq!(suggestions[1].owner, "Bea");
    }

    #[test]
    fn coverage_reports_empty_reasons() {
        let assigned = enrich(&[case("A", Some("Maya"), Urgency::Low, Status::Open)], today());
        assert_eq!(coverage_suggestions(&assigned, 4), Coverage::NoUnassigned);

        let orphaned = enrich(&[case("A", None, Urgency::Low, Status::Open)], today());
        let coverage = coverage_suggestions(&orphaned, 4);
        assert_eq!(coverage, Coverage::NoOwners);
        assert!(coverage.empty_reason().is_some());
    }

    #[test]
    fn owners_with_only_resolved_cases_start_at_zero_load() {
        let cases = enrich(
            &[
                case("A", Some("Maya"), Urgency::Low, Status::Open),
                case("B", Some("Zoe"), Urgency::Low, Status::Resolved),
                case("C", None, Urgency::Low, Status::Open),
            ],
            today(),
        );
        let Coverage::Suggestions(suggestions) = coverage_suggestions(&cases, 2) else {
            panic!("expected suggestions");
        };
        assert_eq!(suggestions[0].owner, "Zoe");
        assert_eq!(suggestions[0].current_load, 0);
    }

    #[test]
    fn owner_focus_ranks_and_limits() {
        let mut overdue = case("Late", Some("Nia"), Urgency::Low, Status::Open);
        overdue.due = Some(days(-2));
        let cases = enrich(
            &[
                case("A", Some("Maya"), Urgency::Low, Status::Open),
                case("B", Some("Maya"), Urgency::High, Status::Open),
                case("C", Some("Maya"), Urgency::Medium, Status::Open),
                overdue,
                case("D", Some("Jordan"), Urgency::Low, Status::Open),
                case("E", None, Urgency::Critical, Status::Open),
            ],
            today(),
        );
        let focus = owner_focus(&cases, OWNER_FOCUS_LIMIT);
        let owners: Vec<_> = focus.iter().map(|entry| entry.load.owner.as_str()).collect();
        assert_eq!(owners, ["Maya", "Nia", "Jordan"]);
        assert_eq!(focus[0].top_cases.len(), 2);
        assert_eq!(focus[0].top_cases[0].record.scholar, "B");
    }

    #[test]
    fn playbook_covers_top_categories_with_default() {
        let mut tech = case("A", None, Urgency::Critical, Status::Open);
        tech.category = "Technology access".into();
        let mut tech_two = case("B", None, Urgency::Low, Status::Open);
        tech_two.category = "Technology access".into();
        let mut housing = case("C", None, Urgency::Low, Status::Open);
        housing.category = "Housing".into();

        let cases = enrich(&[tech, tech_two, housing], today());
        let playbook = response_playbook(&cases);
        assert_eq!(playbook.len(), 2);
        assert_eq!(playbook[0].category, "Technology access");
        assert_eq!(playbook[0].lead, "Technology coordinator");
        assert_eq!(playbook[0].high_urgency_pct, 50);
        assert_eq!(playbook[1].lead, "Case owner");
    }
}
