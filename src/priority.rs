use chrono::{Duration, NaiveDate};

use crate::models::{Band, CaseRecord, EnrichedCase, Status, Urgency, UNSPECIFIED};

pub const STALE_AFTER_DAYS: i64 = 7;
pub const RESOLVED_PENALTY: i64 = 20;
pub const HIGH_BAND_FLOOR: i64 = 45;
pub const MEDIUM_BAND_FLOOR: i64 = 28;

const OVERDUE_POINTS: i64 = 12;
const DUE_SOON_POINTS: i64 = 5;
const TOUCH_OVERDUE_POINTS: i64 = 8;

pub const REC_OVERDUE: &str = "Overdue: update scholar and log next step.";
pub const REC_TOUCH_OVERDUE: &str = "Touchpoint overdue: reach out today.";
pub const REC_DUE_SOON: &str = "Due soon: confirm delivery plan.";
pub const REC_STALE: &str = "Stale touchpoint: send a check-in today.";
pub const REC_ESCALATE: &str = "Escalate: confirm owner response and next step.";
pub const REC_MONITOR: &str = "Monitor and respond within 48 hours.";

pub fn urgency_weight(urgency: &Urgency) -> i64 {
    match urgency {
        Urgency::Low => 1,
        Urgency::Medium => 2,
        Urgency::High => 4,
        Urgency::Critical => 6,
        Urgency::Unrecognized(_) => 1,
    }
}

/// Days allowed between touchpoints.
pub fn touch_window(urgency: &Urgency) -> i64 {
    match urgency {
        Urgency::Low => 7,
        Urgency::Medium => 4,
        Urgency::High => 2,
        Urgency::Critical => 1,
        Urgency::Unrecognized(_) => 4,
    }
}

/// Whole days elapsed since `date`, never negative; zero when there is no date.
pub fn days_since(date: Option<NaiveDate>, today: NaiveDate) -> i64 {
    date.map(|value| (today - value).num_days().max(0))
        .unwrap_or(0)
}

pub fn days_until(date: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    date.map(|value| (value - today).num_days())
}

pub fn band_for(score: i64) -> Band {
    if score >= HIGH_BAND_FLOOR {
        Band::High
    } else if score >= MEDIUM_BAND_FLOOR {
        Band::Medium
    } else {
        Band::Low
    }
}

pub fn score_case(record: CaseRecord, today: NaiveDate) -> EnrichedCase {
    let weight = urgency_weight(&record.urgency);
    let days_since_last = days_since(record.last_touch, today);
    let days_since_created = days_since(Some(record.created), today);

    let due_in_days = days_until(record.due, today);
    let overdue = matches!(due_in_days, Some(days) if days < 0);
    let due_soon = matches!(due_in_days, Some(0..=2));

    let window = touch_window(&record.urgency);
    let next_touch_due = record
        .last_touch
        .and_then(|last| last.checked_add_signed(Duration::days(window)));
    let days_to_next_touch = days_until(next_touch_due, today);
    let touch_overdue = matches!(days_to_next_touch, Some(days) if days < 0);
    let touch_due_soon = matches!(days_to_next_touch, Some(0..=1));

    let mut score = weight * 10 + days_since_last + days_since_created.div_euclid(5);
    if overdue {
        score += OVERDUE_POINTS;
    }
    if due_soon {
        score += DUE_SOON_POINTS;
    }
    if touch_overdue {
        score += TOUCH_OVERDUE_POINTS;
    }
    if record.status == Status::Resolved {
        score -= RESOLVED_PENALTY;
    }

    let recommendation = if overdue {
        REC_OVERDUE
    } else if touch_overdue {
        REC_TOUCH_OVERDUE
    } else if due_soon {
        REC_DUE_SOON
    } else if days_since_last >= STALE_AFTER_DAYS {
        REC_STALE
    } else if record.urgency.is_high() {
        REC_ESCALATE
    } else {
        REC_MONITOR
    };

    EnrichedCase {
        record,
        score,
        band: band_for(score),
        overdue,
        due_soon,
        due_in_days,
        next_touch_due,
        days_to_next_touch,
        touch_overdue,
        touch_due_soon,
        days_since_last,
        days_since_created,
        recommendation,
    }
}

/// Scores every case for `today`, labelling blank channels and categories as unspecified.
pub fn enrich(cases: &[CaseRecord], today: NaiveDate) -> Vec<EnrichedCase> {
    cases
        .iter()
        .cloned()
        .map(|mut record| {
            if record.channel.trim().is_empty() {
                record.channel = UNSPECIFIED.to_string();
            }
            if record.category.trim().is_empty() {
                record.category = UNSPECIFIED.to_string();
            }
            score_case(record, today)
        })
        .collect()
}
