//! Queue-level dashboard panels: headline metrics, the filtered queue,
//! top actions, the risk radar and the outreach plan.

use serde::Serialize;

use crate::models::{EnrichedCase, Status};

pub const TOP_ACTIONS: usize = 5;
pub const OUTREACH_LIMIT: usize = 6;

pub fn active(cases: &[EnrichedCase]) -> impl Iterator<Item = &EnrichedCase> {
    cases.iter().filter(|item| item.is_active())
}

/// Rounded share of `part` in `whole`, zero for an empty whole.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Highest score first. The sort is stable, so ties keep input order.
pub fn by_score_desc<'a>(mut items: Vec<&'a EnrichedCase>) -> Vec<&'a EnrichedCase> {
    items.sort_by(|a, b| b.score.cmp(&a.score));
    items
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total: usize,
    pub overdue: usize,
    pub due_soon: usize,
    pub touch_overdue: usize,
    pub unassigned: usize,
    pub high_urgency: usize,
    pub stale: usize,
}

impl Metrics {
    pub fn labelled(&self) -> [(&'static str, usize); 7] {
        [
            ("Active cases", self.total),
            ("Overdue", self.overdue),
            ("Due soon", self.due_soon),
            ("Touch overdue", self.touch_overdue),
            ("Unassigned", self.unassigned),
            ("High urgency", self.high_urgency),
            ("Stale touchpoints", self.stale),
        ]
    }
}

pub fn metrics(cases: &[EnrichedCase]) -> Metrics {
    active(cases).fold(Metrics::default(), |mut acc, item| {
        acc.total += 1;
        acc.overdue += usize::from(item.overdue);
        acc.due_soon += usize::from(item.due_soon);
        acc.touch_overdue += usize::from(item.touch_overdue);
        acc.unassigned += usize::from(item.is_unassigned());
        acc.high_urgency += usize::from(item.is_high_urgency());
        acc.stale += usize::from(item.is_stale());
        acc
    })
}

/// Search text plus status/owner selectors. `None` selectors mean "all".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueFilter {
    pub query: String,
    pub status: Option<Status>,
    pub owner: Option<String>,
}

impl QueueFilter {
    pub fn new(query: Option<&str>, status: &str, owner: &str) -> Self {
        let selector = |value: &str| {
            let value = value.trim();
            if value.is_empty() || value.eq_ignore_ascii_case("all") {
                None
            } else {
                Some(value.to_string())
            }
        };
        Self {
            query: query.unwrap_or_default().to_lowercase(),
            status: selector(status).map(|value| Status::parse(&value)),
            owner: selector(owner),
        }
    }

    pub fn matches(&self, item: &EnrichedCase) -> bool {
        let text_match = self.query.is_empty()
            || item.record.scholar.to_lowercase().contains(&self.query)
            || item.record.summary.to_lowercase().contains(&self.query);
        let status_match = self
            .status
            .as_ref()
            .map_or(true, |status| &item.record.status == status);
        let owner_match = self
            .owner
            .as_deref()
            .map_or(true, |owner| item.record.owner.as_deref() == Some(owner));
        text_match && status_match && owner_match
    }
}

pub fn queue<'a>(cases: &'a [EnrichedCase], filter: &QueueFilter) -> Vec<&'a EnrichedCase> {
    by_score_desc(cases.iter().filter(|item| filter.matches(item)).collect())
}

pub fn top_actions(cases: &[EnrichedCase], limit: usize) -> Vec<&EnrichedCase> {
    let mut ranked = by_score_desc(active(cases).collect());
    ranked.truncate(limit);
    ranked
}

/// Sorted, de-duplicated owner names for the queue's owner selector.
pub fn owner_options(cases: &[EnrichedCase]) -> Vec<String> {
    let owners: std::collections::BTreeSet<&str> = cases
        .iter()
        .filter_map(|item| item.record.owner.as_deref())
        .collect();
    owners.into_iter().map(str::to_string).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Danger,
    Warning,
    Ok,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskSignal {
    pub key: &'static str,
    pub label: &'static str,
    pub count: usize,
    pub severity: Severity,
}

pub fn risk_radar(metrics: &Metrics) -> Vec<RiskSignal> {
    let signal = |key, label, count: usize, hot| RiskSignal {
        key,
        label,
        count,
        severity: if count == 0 { Severity::Ok } else { hot },
    };
    vec![
        signal("overdue", "Overdue cases", metrics.overdue, Severity::Danger),
        signal(
            "touchOverdue",
            "Touchpoints overdue",
            metrics.touch_overdue,
            Severity::Danger,
        ),
        signal("unassigned", "Unassigned", metrics.unassigned, Severity::Danger),
        signal("dueSoon", "Due within 2 days", metrics.due_soon, Severity::Warning),
        signal(
            "highUrgency",
            "High or critical urgency",
            metrics.high_urgency,
            Severity::Warning,
        ),
        signal("stale", "Stale touchpoints", metrics.stale, Severity::Warning),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutreachItem<'a> {
    #[serde(rename = "case")]
    pub item: &'a EnrichedCase,
    pub reasons: Vec<&'static str>,
}

fn outreach_reasons(item: &EnrichedCase) -> Vec<&'static str> {
    let checks = [
        (item.overdue, "overdue"),
        (item.touch_overdue, "touch overdue"),
        (item.due_soon, "due soon"),
        (item.touch_due_soon, "touch due soon"),
        (item.is_stale(), "stale"),
        (item.is_high_urgency(), "high urgency"),
    ];
    checks
        .into_iter()
        .filter_map(|(hit, reason)| hit.then_some(reason))
        .collect()
}

pub fn outreach_plan(cases: &[EnrichedCase]) -> Vec<OutreachItem<'_>> {
    let flagged = active(cases)
        .filter(|item| !outreach_reasons(item).is_empty())
        .collect();
    by_score_desc(flagged)
        .into_iter()
        .take(OUTREACH_LIMIT)
        .map(|item| OutreachItem {
            item,
            reasons: outreach_reasons(item),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Urgency;
    use crate::priority::tests::{days, sample_case, today};
    use crate::priority::{enrich, score_case};

    fn scored(scholar: &str, urgency: Urgency, status: Status, owner: Option<&str>) -> EnrichedCase {
        let mut record = sample_case(urgency, status);
        record.scholar = scholar.to_string();
        record.owner = owner.map(str::to_string);
        score_case(record, today())
    }

    #[test]
    fn metrics_count_only_active_cases() {
        let mut overdue = sample_case(Urgency::High, Status::Open);
        overdue.due = Some(days(-1));
        overdue.owner = None;
        let mut stale = sample_case(Urgency::Low, Status::Pending);
        stale.last_touch = Some(days(-9));
        let mut resolved = sample_case(Urgency::Critical, Status::Resolved);
        resolved.due = Some(days(-3));

        let cases = enrich(&[overdue, stale, resolved], today());
        let summary = metrics(&cases);
        assert_eq!(
            summary,
            Metrics {
                total: 2,
                overdue: 1,
                due_soon: 0,
                touch_overdue: 1,
                unassigned: 1,
                high_urgency: 1,
                stale: 1,
            }
        );
        assert_eq!(summary.labelled()[0], ("Active cases", 2));
    }

    #[test]
    fn queue_filters_and_keeps_ties_stable() {
        let cases = vec![
            scored("Renee Brooks", Urgency::Low, Status::Open, Some("Maya")),
            scored("Luis Carter", Urgency::Critical, Status::Open, Some("Jordan")),
            scored("Sami Patel", Urgency::Low, Status::Open, Some("Maya")),
            scored("Kayla Nguyen", Urgency::Low, Status::Resolved, Some("Maya")),
        ];

        let all = queue(&cases, &QueueFilter::default());
        let names: Vec<_> = all.iter().map(|item| item.record.scholar.as_str()).collect();
        assert_eq!(names, ["Luis Carter", "Renee Brooks", "Sami Patel", "Kayla Nguyen"]);

        let filtered = queue(&cases, &QueueFilter::new(Some("PATEL"), "all", "Maya"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].record.scholar, "Sami Patel");
        let spaced = queue(&cases, &QueueFilter::new(Some(" Patel"), "all", "all"));
        assert_eq!(spaced.len(), 1);
        assert!(queue(&cases, &QueueFilter::new(Some("Patel "), "all", "all")).is_empty());

        let resolved = queue(&cases, &QueueFilter::new(None, "Resolved", "all"));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].record.scholar, "Kayla Nguyen");

        let by_summary = queue(&cases, &QueueFilter::new(Some("tuition"), "all", "Jordan"));
        assert_eq!(by_summary.len(), 1);
    }

    #[test]
    fn top_actions_skip_resolved_and_cap_at_limit() {
        let mut cases: Vec<EnrichedCase> = (0..7)
            .map(|idx| scored(&format!("Scholar {idx}"), Urgency::Medium, Status::Open, None))
            .collect();
        cases.push(scored("Closed", Urgency::Critical, Status::Resolved, None));
        let top = top_actions(&cases, TOP_ACTIONS);
        assert_eq!(top.len(), 5);
        assert!(top.iter().all(|item| item.is_active()));
        assert_eq!(top[0].record.scholar, "Scholar 0");
    }

    #[test]
    fn risk_radar_severity_mapping() {
        let radar = risk_radar(&Metrics {
            total: 4,
            overdue: 1,
            due_soon: 2,
            touch_overdue: 0,
            unassigned: 0,
            high_urgency: 0,
            stale: 3,
        });
        let severities: Vec<_> = radar.iter().map(|signal| (signal.key, signal.severity)).collect();
        assert_eq!(
            severities,
            [
                ("overdue", Severity::Danger),
                ("touchOverdue", Severity::Ok),
                ("unassigned", Severity::Ok),
                ("dueSoon", Severity::Warning),
                ("highUrgency", Severity::Ok),
                ("stale", Severity::Warning),
            ]
        );
    }

    #[test]
    fn outreach_plan_picks_flagged_cases() {
        let mut quiet = sample_case(Urgency::Low, Status::Open);
        quiet.scholar = "Quiet".into();
        let mut due = sample_case(Urgency::Medium, Status::Open);
        due.scholar = "Due".into();
        due.due = Some(days(1));
        let hot = sample_case(Urgency::Critical, Status::Open);

        let cases = enrich(&[quiet, due, hot], today());
        let plan = outreach_plan(&cases);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].item.record.urgency, Urgency::Critical);
        assert_eq!(plan[0].reasons, ["touch due soon", "high urgency"]);
        assert_eq!(plan[1].reasons, ["due soon"]);
    }

    #[test]
    fn owner_options_are_sorted_and_unique() {
        let cases = vec![
            scored("A", Urgency::Low, Status::Open, Some("Nia")),
            scored("B", Urgency::Low, Status::Open, Some("Maya")),
            scored("C", Urgency::Low, Status::Open, Some("Nia")),
            scored("D", Urgency::Low, Status::Open, None),
        ];
        assert_eq!(owner_options(&cases), ["Maya", "Nia"]);
    }

    #[test]
    fn views_are_idempotent() {
        let cases = vec![
            scored("A", Urgency::High, Status::Open, None),
            scored("B", Urgency::Low, Status::Pending, Some("Maya")),
        ];
        assert_eq!(metrics(&cases), metrics(&cases));
        assert_eq!(top_actions(&cases, 5), top_actions(&cases, 5));
        assert_eq!(outreach_plan(&cases), outreach_plan(&cases));
    }
}
