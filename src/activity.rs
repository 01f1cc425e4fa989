use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{CaseRecord, Event, EventAction, Urgency};

pub const EVENT_LOG_CAP: usize = 50;
pub const FEED_LIMIT: usize = 8;

pub fn new_event(action: EventAction, record: &CaseRecord, at: DateTime<Utc>) -> Event {
    let detail = match action {
        EventAction::Created => format!("Opened via {}: {}", record.channel, record.summary),
        EventAction::Touched => format!("Touchpoint logged for {}", record.summary),
        EventAction::Resolved => format!("Resolved: {}", record.summary),
        EventAction::Reopened => format!("Reopened for follow-up: {}", record.summary),
    };
    Event {
        id: Uuid::new_v4(),
        action,
        at,
        case_id: record.id,
        scholar: record.scholar.clone(),
        owner: record.owner.clone(),
        urgency: record.urgency.clone(),
        detail,
    }
}

/// Prepends `event` and drops anything past the newest `EVENT_LOG_CAP` entries.
pub fn push_event(log: &mut Vec<Event>, event: Event) {
    log.insert(0, event);
    log.truncate(EVENT_LOG_CAP);
}

pub fn action_label(action: EventAction) -> &'static str {
    match action {
        EventAction::Created => "Case created",
        EventAction::Touched => "Touchpoint logged",
        EventAction::Resolved => "Case resolved",
        EventAction::Reopened => "Case reopened",
    }
}

pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    if elapsed.num_seconds() < 60 {
        return "just now".to_string();
    }
    if elapsed.num_minutes() < 60 {
        return format!("{}m ago", elapsed.num_minutes());
    }
    if elapsed.num_hours() < 24 {
        return format!("{}h ago", elapsed.num_hours());
    }
    match elapsed.num_days() {
        1 => "yesterday".to_string(),
        days if days < 7 => format!("{days}d ago"),
        _ => at.format("%Y-%m-%d").to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub label: &'static str,
    pub when: String,
    pub scholar: String,
    pub detail: String,
    pub owner: String,
    pub urgency: Urgency,
}

pub fn activity_feed(events: &[Event], now: DateTime<Utc>) -> Vec<FeedItem> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| b.at.cmp(&a.at));
    ordered
        .into_iter()
        .take(FEED_LIMIT)
        .map(|event| FeedItem {
            label: action_label(event.action),
            when: relative_time(event.at, now),
            scholar: event.scholar.clone(),
            detail: event.detail.clone(),
            owner: event
                .owner
                .clone()
                .unwrap_or_else(|| crate::models::UNASSIGNED.to_string()),
            urgency: event.urgency.clone(),
        })
        .collect()
}
