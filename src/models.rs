use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const UNASSIGNED: &str = "Unassigned";
pub const UNSPECIFIED: &str = "Unspecified";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
    /// Any label outside the closed set. Scoring treats it with the default weights.
    Unrecognized(String),
}

impl Urgency {
    /// Display order used by the cadence and mix panels.
    pub const LEVELS: [Urgency; 4] = [
        Urgency::Critical,
        Urgency::High,
        Urgency::Medium,
        Urgency::Low,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Low" => Urgency::Low,
            "Medium" => Urgency::Medium,
            "High" => Urgency::High,
            "Critical" => Urgency::Critical,
            other => Urgency::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Urgency::Low => "Low",
            Urgency::Medium => "Medium",
            Urgency::High => "High",
            Urgency::Critical => "Critical",
            Urgency::Unrecognized(raw) => raw,
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Urgency::High | Urgency::Critical)
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Unrecognized(String::new())
    }
}

impl From<String> for Urgency {
    fn from(raw: String) -> Self {
        Urgency::parse(&raw)
    }
}

impl From<Urgency> for String {
    fn from(urgency: Urgency) -> Self {
        urgency.as_str().to_string()
    }
}

impl std::str::FromStr for Urgency {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Urgency::parse(s))
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Open,
    Pending,
    Resolved,
    Unrecognized(String),
}

impl Status {
    /// `Reopened` is folded into `Open`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Open" | "Reopened" => Status::Open,
            "Pending" => Status::Pending,
            "Resolved" => Status::Resolved,
            other => Status::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Open => "Open",
            Status::Pending => "Pending",
            Status::Resolved => "Resolved",
            Status::Unrecognized(raw) => raw,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Status::Resolved)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Open
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        Status::parse(&raw)
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl std::str::FromStr for Status {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Status::parse(s))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scholar support ticket as stored by either backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub scholar: String,
    pub summary: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub status: Status,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub owner: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub next_step: Option<String>,
    #[serde(deserialize_with = "calendar_date")]
    pub created: NaiveDate,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub last_touch: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub due: Option<NaiveDate>,
}

impl CaseRecord {
    pub fn owner_label(&self) -> &str {
        self.owner.as_deref().unwrap_or(UNASSIGNED)
    }
}

/// Partial update. Present fields overwrite; a blank owner or next step clears it,
/// and `due: Some(None)` clears the due date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasePatch {
    pub scholar: Option<String>,
    pub summary: Option<String>,
    pub channel: Option<String>,
    pub category: Option<String>,
    pub urgency: Option<Urgency>,
    pub status: Option<Status>,
    pub owner: Option<String>,
    pub next_step: Option<String>,
    pub created: Option<NaiveDate>,
    pub last_touch: Option<NaiveDate>,
    pub due: Option<Option<NaiveDate>>,
}

impl CasePatch {
    pub fn is_empty(&self) -> bool {
        *self == CasePatch::default()
    }

    pub fn apply(&self, record: &mut CaseRecord) {
        if let Some(value) = &self.scholar {
            record.scholar = value.clone();
        }
        if let Some(value) = &self.summary {
            record.summary = value.clone();
        }
        if let Some(value) = &self.channel {
            record.channel = value.clone();
        }
        if let Some(value) = &self.category {
            record.category = value.clone();
        }
        if let Some(value) = &self.urgency {
            record.urgency = value.clone();
        }
        if let Some(value) = &self.status {
            record.status = value.clone();
        }
        if let Some(value) = &self.owner {
            record.owner = non_blank(value);
        }
        if let Some(value) = &self.next_step {
            record.next_step = non_blank(value);
        }
        if let Some(value) = self.created {
            record.created = value;
        }
        if let Some(value) = self.last_touch {
            record.last_touch = Some(value);
        }
        if let Some(value) = self.due {
            record.due = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Low,
    Medium,
    High,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Band::Low => "low",
            Band::Medium => "medium",
            Band::High => "high",
        };
        f.write_str(label)
    }
}

/// A case plus everything the priority engine derives from it for a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCase {
    #[serde(flatten)]
    pub record: CaseRecord,
    pub score: i64,
    pub band: Band,
    pub overdue: bool,
    pub due_soon: bool,
    pub due_in_days: Option<i64>,
    pub next_touch_due: Option<NaiveDate>,
    pub days_to_next_touch: Option<i64>,
    pub touch_overdue: bool,
    pub touch_due_soon: bool,
    pub days_since_last: i64,
    pub days_since_created: i64,
    pub recommendation: &'static str,
}

impl EnrichedCase {
    pub fn is_active(&self) -> bool {
        self.record.status.is_active()
    }

    pub fn is_unassigned(&self) -> bool {
        self.record.owner.is_none()
    }

    pub fn is_high_urgency(&self) -> bool {
        self.record.urgency.is_high()
    }

    pub fn is_stale(&self) -> bool {
        self.days_since_last >= crate::priority::STALE_AFTER_DAYS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Created,
    Touched,
    Resolved,
    Reopened,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Created => "created",
            EventAction::Touched => "touched",
            EventAction::Resolved => "resolved",
            EventAction::Reopened => "reopened",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(EventAction::Created),
            "touched" => Some(EventAction::Touched),
            "resolved" => Some(EventAction::Resolved),
            "reopened" => Some(EventAction::Reopened),
            _ => None,
        }
    }
}

/// Append-only history entry for the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub action: EventAction,
    pub at: DateTime<Utc>,
    pub case_id: Uuid,
    pub scholar: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    pub detail: String,
}

/// First id that appears more than once across `records`.
pub fn first_duplicate_id<'a>(records: impl IntoIterator<Item = &'a CaseRecord>) -> Option<Uuid> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .map(|record| record.id)
        .find(|id| !seen.insert(*id))
}

pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(non_blank))
}

fn calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(raw.trim()).map_err(serde::de::Error::custom)
}

fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_calendar_date(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Accepts `YYYY-MM-DD`, or a full timestamp whose leading ten characters are one.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_enum_labels_are_preserved() {
        assert_eq!(Urgency::parse("Severe"), Urgency::Unrecognized("Severe".into()));
        assert_eq!(Urgency::parse("Severe").as_str(), "Severe");
        assert_eq!(Status::parse("Reopened"), Status::Open);
        assert!(Status::parse("Escalated").is_active());
        assert!(!Status::Resolved.is_active());
    }

    #[test]
    fn deserializes_camel_case_json_shape() {
        let raw = r#"{
            "id": "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
            "scholar": "Avery Hill",
            "summary": "Tuition payment gap",
            "channel": "Email",
            "category": "Financial aid",
            "urgency": "High",
            "status": "Open",
            "owner": "",
            "nextStep": "Confirm balance",
            "created": "2026-03-01",
            "lastTouch": "2026-03-04",
            "due": ""
        }"#;
        let record: CaseRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.urgency, Urgency::High);
        assert_eq!(record.owner, None);
        assert_eq!(record.next_step.as_deref(), Some("Confirm balance"));
        assert_eq!(record.last_touch, NaiveDate::from_ymd_opt(2026, 3, 4));
        assert_eq!(record.due, None);
        assert_eq!(record.owner_label(), UNASSIGNED);
    }

    #[test]
    fn missing_id_gets_generated() {
        let raw = r#"{"scholar":"Sami","summary":"Tutoring","created":"2026-03-01T09:00:00Z"}"#;
        let record: CaseRecord = serde_json::from_str(raw).unwrap();
        assert!(!record.id.is_nil());
        assert_eq!(record.created, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(record.status, Status::Open);
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut record: CaseRecord = serde_json::from_str(
            r#"{"scholar":"Sami","summary":"Tutoring","owner":"Nia","created":"2026-03-01"}"#,
        )
        .unwrap();
        let patch = CasePatch {
            status: Some(Status::Resolved),
            owner: Some("  ".into()),
            ..CasePatch::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut record);
        assert_eq!(record.status, Status::Resolved);
        assert_eq!(record.owner, None);
        assert_eq!(record.scholar, "Sami");
    }

    #[test]
    fn patch_sets_and_clears_due() {
        let mut record: CaseRecord = serde_json::from_str(
            r#"{"scholar":"Sami","summary":"Tutoring","created":"2026-03-01"}"#,
        )
        .unwrap();
        let due = NaiveDate::from_ymd_opt(2026, 3, 12);
        CasePatch {
            due: Some(due),
            ..CasePatch::default()
        }
        .apply(&mut record);
        assert_eq!(record.due, due);

        let clear = CasePatch {
            due: Some(None),
            ..CasePatch::default()
        };
        assert!(!clear.is_empty());
        clear.apply(&mut record);
        assert_eq!(record.due, None);
    }

    #[test]
    fn finds_repeated_ids() {
        let raw = r#"{"scholar":"Sami","summary":"Tutoring","created":"2026-03-01"}"#;
        let first: CaseRecord = serde_json::from_str(raw).unwrap();
        let second: CaseRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(first_duplicate_id([&first, &second]), None);
        let copy = first.clone();
        assert_eq!(first_duplicate_id([&first, &second, &copy]), Some(first.id));
    }
}
