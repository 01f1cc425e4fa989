//! JSON and CSV import/export of case records.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{non_blank, parse_calendar_date, CaseRecord, Status, Urgency};

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    List(Vec<CaseRecord>),
    Wrapped { cases: Vec<CaseRecord> },
}

/// Accepts either a bare array of cases or an export envelope `{ "cases": [...] }`.
pub fn parse_json_cases(raw: &str) -> anyhow::Result<Vec<CaseRecord>> {
    let payload: ImportPayload =
        serde_json::from_str(raw).context("expected a JSON array of cases or an object with a `cases` array")?;
    Ok(match payload {
        ImportPayload::List(cases) | ImportPayload::Wrapped { cases } => cases,
    })
}

pub fn read_json_cases(path: &Path) -> anyhow::Result<Vec<CaseRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_json_cases(&raw).with_context(|| format!("invalid import file {}", path.display()))
}

#[derive(Deserialize)]
struct CsvRow {
    id: Option<String>,
    scholar: String,
    summary: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    urgency: String,
    #[serde(default)]
    status: String,
    owner: Option<String>,
    next_step: Option<String>,
    created: String,
    last_touch: Option<String>,
    due: Option<String>,
}

fn optional_date(value: Option<&str>, field: &str) -> anyhow::Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_calendar_date(value)
            .map(Some)
            .with_context(|| format!("invalid {field} date {value:?}")),
        None => Ok(None),
    }
}

impl CsvRow {
    fn into_record(self) -> anyhow::Result<CaseRecord> {
        let id = match self.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(raw) => Uuid::parse_str(raw).with_context(|| format!("invalid case id {raw:?}"))?,
            None => Uuid::new_v4(),
        };
        let created = parse_calendar_date(self.created.trim())
            .with_context(|| format!("invalid created date {:?}", self.created))?;
        Ok(CaseRecord {
            id,
            scholar: self.scholar.trim().to_string(),
            summary: self.summary.trim().to_string(),
            channel: self.channel.trim().to_string(),
            category: self.category.trim().to_string(),
            urgency: Urgency::parse(&self.urgency),
            status: Status::parse(&self.status),
            owner: self.owner.as_deref().and_then(non_blank),
            next_step: self.next_step.as_deref().and_then(non_blank),
            created,
            last_touch: optional_date(self.last_touch.as_deref(), "last_touch")?,
            due: optional_date(self.due.as_deref(), "due")?,
        })
    }
}

pub fn read_csv_cases<R: std::io::Read>(reader: R) -> anyhow::Result<Vec<CaseRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let mut cases = Vec::new();
    for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = idx + 2;
        let row = result.with_context(|| format!("malformed CSV row on line {line}"))?;
        cases.push(row.into_record().with_context(|| format!("CSV line {line}"))?);
    }
    Ok(cases)
}

pub fn read_csv_file(path: &Path) -> anyhow::Result<Vec<CaseRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_csv_cases(file)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportPayload<'a> {
    generated_at: DateTime<Utc>,
    cases: &'a [CaseRecord],
}

pub fn export_json(cases: &[CaseRecord], generated_at: DateTime<Utc>) -> anyhow::Result<String> {
    let payload = ExportPayload {
        generated_at,
        cases,
    };
    Ok(serde_json::to_string_pretty(&payload)?)
}
