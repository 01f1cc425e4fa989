use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::activity::push_event;
use crate::models::{first_duplicate_id, CasePatch, CaseRecord, Event};

const CASES_FILE: &str = "local-cases.json";
const EVENTS_FILE: &str = "local-events.json";

/// File-backed store used when no database is configured.
#[derive(Debug, Clone)]
pub struct LocalStore {
    cases_path: PathBuf,
    events_path: PathBuf,
}

impl LocalStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            cases_path: dir.join(CASES_FILE),
            events_path: dir.join(EVENTS_FILE),
        }
    }

    pub fn location(&self) -> &Path {
        &self.cases_path
    }

    async fn read_list<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).with_context(|| {
            format!("{} is not a valid local store file; fix or remove it", path.display())
        })
    }

    async fn write_list<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let payload = serde_json::to_string_pretty(items)?;
        tokio::fs::write(path, payload)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), count = items.len(), "wrote local store file");
        Ok(())
    }

    pub async fn list(&self) -> anyhow::Result<Vec<CaseRecord>> {
        let mut cases: Vec<CaseRecord> = Self::read_list(&self.cases_path).await?;
        cases.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(cases)
    }

    pub async fn insert(&self, records: &[CaseRecord]) -> anyhow::Result<()> {
        let mut cases: Vec<CaseRecord> = Self::read_list(&self.cases_path).await?;
        if let Some(id) = first_duplicate_id(cases.iter().chain(records)) {
            bail!("duplicate case id {id}");
        }
        cases.extend_from_slice(records);
        Self::write_list(&self.cases_path, &cases).await
    }

    pub async fn update(&self, id: Uuid, patch: &CasePatch) -> anyhow::Result<Option<CaseRecord>> {
        let mut cases: Vec<CaseRecord> = Self::read_list(&self.cases_path).await?;
        let Some(record) = cases.iter_mut().find(|record| record.id == id) else {
            return Ok(None);
        };
        patch.apply(record);
        let updated = record.clone();
        Self::write_list(&self.cases_path, &cases).await?;
        Ok(Some(updated))
    }

    pub async fn replace_all(&self, records: &[CaseRecord]) -> anyhow::Result<()> {
        if let Some(id) = first_duplicate_id(records) {
            bail!("duplicate case id {id}");
        }
        Self::write_list(&self.cases_path, records).await
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        Self::write_list::<CaseRecord>(&self.cases_path, &[]).await
    }

    pub async fn record_event(&self, event: Event) -> anyhow::Result<()> {
        let mut events: Vec<Event> = Self::read_list(&self.events_path).await?;
        push_event(&mut events, event);
        Self::write_list(&self.events_path, &events).await
    }

    pub async fn recent_events(&self) -> anyhow::Result<Vec<Event>> {
        Self::read_list(&self.events_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::new_event;
    use crate::models::{EventAction, Status, Urgency};
    use crate::priority::tests::{days, sample_case};
    use chrono::Utc;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.recent_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_update_and_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(&dir.path().join("nested"));

        let mut older = sample_case(Urgency::Low, Status::Open);
        older.created = days(-5);
        let newer = sample_case(Urgency::High, Status::Open);
        store.insert(&[older.clone(), newer.clone()]).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed, vec![newer.clone(), older.clone()]);

        let patch = CasePatch {
            status: Some(Status::Resolved),
            ..CasePatch::default()
        };
        let updated = store.update(older.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.status, Status::Resolved);
        assert!(store.update(Uuid::new_v4(), &patch).await.unwrap().is_none());

        store.clear().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_file_is_reported_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CASES_FILE);
        let raw = r#"[{"scholar":"X","summary":"Y","created":"bad"}]"#;
        std::fs::write(&path, raw).unwrap();
        let store = LocalStore::new(dir.path());

        let err = store.list().await.unwrap_err();
        assert!(format!("{err:#}").contains(CASES_FILE));
        let insert = store.insert(&[sample_case(Urgency::Low, Status::Open)]).await;
        assert!(insert.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let record = sample_case(Urgency::Low, Status::Open);
        store.insert(std::slice::from_ref(&record)).await.unwrap();

        let err = store.insert(std::slice::from_ref(&record)).await.unwrap_err();
        assert!(err.to_string().contains(&record.id.to_string()));
        let mut twin = sample_case(Urgency::High, Status::Open);
        twin.id = record.id;
        assert!(store.replace_all(&[record.clone(), twin]).await.is_err());
        assert_eq!(store.list().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn events_are_stored_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let record = sample_case(Urgency::Medium, Status::Open);
        store
            .record_event(new_event(EventAction::Created, &record, Utc::now()))
            .await
            .unwrap();
        store
            .record_event(new_event(EventAction::Touched, &record, Utc::now()))
            .await
            .unwrap();
        let events = store.recent_events().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::Touched);
    }
}
