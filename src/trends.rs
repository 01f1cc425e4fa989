//! Time-based panels: resolution velocity, SLA compliance, touchpoint
//! cadence, case aging and the upcoming SLA outlook.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{EnrichedCase, Status, Urgency};
use crate::views::{active, percent};

pub const THROUGHPUT_WINDOW_DAYS: i64 = 7;
pub const RESOLUTION_WINDOW_DAYS: i64 = 30;
pub const OUTLOOK_DUE_DAYS: i64 = 3;
pub const OUTLOOK_TOUCH_DAYS: i64 = 2;

/// Middle element of the sorted values; for even lengths this is the upper middle.
pub fn middle_value(mut values: Vec<i64>) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    Some(values[values.len() / 2])
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Velocity {
    pub intake7: usize,
    pub resolved7: usize,
    pub net7: i64,
    pub resolved30: usize,
    pub median_resolution: Option<i64>,
    pub on_time_rate: Option<u32>,
}

pub fn resolution_velocity(cases: &[EnrichedCase]) -> Velocity {
    let intake7 = cases
        .iter()
        .filter(|item| item.days_since_created <= THROUGHPUT_WINDOW_DAYS)
        .count();

    let resolved: Vec<&EnrichedCase> = cases
        .iter()
        .filter(|item| item.record.status == Status::Resolved && item.record.last_touch.is_some())
        .collect();
    let resolved7 = resolved
        .iter()
        .filter(|item| item.days_since_last <= THROUGHPUT_WINDOW_DAYS)
        .count();

    let recent: Vec<&EnrichedCase> = resolved
        .into_iter()
        .filter(|item| item.days_since_last <= RESOLUTION_WINDOW_DAYS)
        .collect();
    let durations = recent
        .iter()
        .filter_map(|item| {
            let last = item.record.last_touch?;
            Some((last - item.record.created).num_days().max(0))
        })
        .collect();

    let mut with_due = 0;
    let mut on_time = 0;
    for item in &recent {
        if let (Some(last), Some(due)) = (item.record.last_touch, item.record.due) {
            with_due += 1;
            on_time += usize::from(last <= due);
        }
    }

    Velocity {
        intake7,
        resolved7,
        net7: resolved7 as i64 - intake7 as i64,
        resolved30: recent.len(),
        median_resolution: middle_value(durations),
        on_time_rate: (with_due > 0).then(|| percent(on_time, with_due)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaCompliance {
    pub on_time_rate: Option<u32>,
    pub touch_compliance: Option<u32>,
    pub upcoming_risk: usize,
    pub overdue: usize,
}

pub fn sla_compliance(cases: &[EnrichedCase], velocity: &Velocity) -> SlaCompliance {
    let mut total = 0;
    let mut touch_ok = 0;
    let mut upcoming_risk = 0;
    let mut overdue = 0;
    for item in active(cases) {
        total += 1;
        touch_ok += usize::from(!item.touch_overdue);
        upcoming_risk += usize::from(item.due_soon) + usize::from(item.touch_due_soon);
        overdue += usize::from(item.overdue);
    }
    SlaCompliance {
        on_time_rate: velocity.on_time_rate,
        touch_compliance: (total > 0).then(|| percent(touch_ok, total)),
        upcoming_risk,
        overdue,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CadenceRow {
    pub urgency: Urgency,
    pub count: usize,
    pub touch_overdue: usize,
    pub touch_due_soon: usize,
    pub avg_days_since_last: Option<i64>,
    pub overdue_pct: u32,
    pub due_soon_pct: u32,
    pub ok_pct: u32,
}

impl CadenceRow {
    pub fn is_hotspot(&self) -> bool {
        self.touch_overdue > 0 || self.touch_due_soon > 0
    }
}

pub fn touchpoint_cadence(cases: &[EnrichedCase]) -> Vec<CadenceRow> {
    Urgency::LEVELS
        .iter()
        .map(|level| {
            let rows: Vec<&EnrichedCase> = active(cases)
                .filter(|item| &item.record.urgency == level)
                .collect();
            let count = rows.len();
            let touch_overdue = rows.iter().filter(|item| item.touch_overdue).count();
            let touch_due_soon = rows.iter().filter(|item| item.touch_due_soon).count();
            let total_days: i64 = rows.iter().map(|item| item.days_since_last).sum();

            let (overdue_pct, due_soon_pct, ok_pct) = if count == 0 {
                (0, 0, 0)
            } else {
                let overdue_pct = percent(touch_overdue, count).min(100);
                let due_soon_pct = percent(touch_due_soon, count).min(100 - overdue_pct);
                (overdue_pct, due_soon_pct, 100 - overdue_pct - due_soon_pct)
            };

            CadenceRow {
                urgency: level.clone(),
                count,
                touch_overdue,
                touch_due_soon,
                avg_days_since_last: (count > 0)
                    .then(|| (total_days as f64 / count as f64).round() as i64),
                overdue_pct,
                due_soon_pct,
                ok_pct,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgingBucket {
    pub label: &'static str,
    pub count: usize,
    pub pct: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingSummary {
    pub total: usize,
    pub buckets: Vec<AgingBucket>,
    pub median_age: Option<i64>,
}

const AGE_BUCKETS: [(&str, i64, i64); 4] = [
    ("0-2 days", 0, 2),
    ("3-6 days", 3, 6),
    ("7-13 days", 7, 13),
    ("14+ days", 14, i64::MAX),
];

pub fn aging_summary(cases: &[EnrichedCase]) -> AgingSummary {
    let ages: Vec<i64> = active(cases).map(|item| item.days_since_created).collect();
    let total = ages.len();
    let buckets = AGE_BUCKETS
        .iter()
        .map(|&(label, low, high)| {
            let count = ages.iter().filter(|age| (low..=high).contains(*age)).count();
            AgingBucket {
                label,
                count,
                pct: percent(count, total),
            }
        })
        .collect();
    AgingSummary {
        total,
        buckets,
        median_age: middle_value(ages),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutlookKind {
    CaseDue,
    TouchDue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlookEntry<'a> {
    pub kind: OutlookKind,
    pub delta: i64,
    #[serde(rename = "case")]
    pub item: &'a EnrichedCase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlookDay<'a> {
    pub date: NaiveDate,
    pub entries: Vec<OutlookEntry<'a>>,
}

pub fn sla_outlook(cases: &[EnrichedCase]) -> Vec<OutlookDay<'_>> {
    let mut days: BTreeMap<NaiveDate, Vec<OutlookEntry<'_>>> = BTreeMap::new();
    for item in active(cases) {
        if let (Some(due), Some(delta)) = (item.record.due, item.due_in_days) {
            if (0..=OUTLOOK_DUE_DAYS).contains(&delta) {
                days.entry(due).or_default().push(OutlookEntry {
                    kind: OutlookKind::CaseDue,
                    delta,
                    item,
                });
            }
        }
        if let (Some(touch), Some(delta)) = (item.next_touch_due, item.days_to_next_touch) {
            if (0..=OUTLOOK_TOUCH_DAYS).contains(&delta) {
                days.entry(touch).or_default().push(OutlookEntry {
                    kind: OutlookKind::TouchDue,
                    delta,
                    item,
                });
            }
        }
    }

    days.into_iter()
        .map(|(date, mut entries)| {
            entries.sort_by(|a, b| {
                a.delta
                    .cmp(&b.delta)
                    .then_with(|| a.kind.cmp(&b.kind))
                    .then_with(|| b.item.score.cmp(&a.item.score))
            });
            OutlookDay { date, entries }
        })
        .collect()
}
