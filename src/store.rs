//! Storage adapter: Postgres when `DATABASE_URL` is configured, otherwise
//! the local JSON file fallback. Quick actions and seeding sit on top.

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::activity::new_event;
use crate::config::Config;
use crate::db;
use crate::local::LocalStore;
use crate::models::{first_duplicate_id, CasePatch, CaseRecord, Event, EventAction, Status, Urgency};

pub enum CaseStore {
    Postgres(PgPool),
    LocalFile(LocalStore),
}

impl CaseStore {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(url)
                    .await
                    .context("failed to connect to Postgres")?;
                tracing::info!(backend = "postgres", "storage ready");
                Ok(CaseStore::Postgres(pool))
            }
            None => {
                let store = LocalStore::new(&config.data_dir);
                tracing::info!(
                    backend = "local-file",
                    path = %store.location().display(),
                    "storage ready"
                );
                Ok(CaseStore::LocalFile(store))
            }
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            CaseStore::Postgres(_) => "postgres",
            CaseStore::LocalFile(_) => "local-file",
        }
    }

    pub async fn init(&self) -> anyhow::Result<bool> {
        match self {
            CaseStore::Postgres(pool) => {
                db::init_db(pool).await?;
                Ok(true)
            }
            CaseStore::LocalFile(_) => Ok(false),
        }
    }

    pub async fn health(&self) -> anyhow::Result<()> {
        match self {
            CaseStore::Postgres(pool) => db::ping(pool).await,
            CaseStore::LocalFile(store) => store.list().await.map(|_| ()),
        }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<CaseRecord>> {
        let cases = match self {
            CaseStore::Postgres(pool) => db::fetch_cases(pool).await?,
            CaseStore::LocalFile(store) => store.list().await?,
        };
        tracing::debug!(backend = self.backend(), count = cases.len(), "loaded cases");
        Ok(cases)
    }

    async fn insert(&self, records: &[CaseRecord]) -> anyhow::Result<()> {
        if let Some(id) = first_duplicate_id(records) {
            bail!("duplicate case id {id}");
        }
        match self {
            CaseStore::Postgres(pool) => db::insert_cases(pool, records).await,
            CaseStore::LocalFile(store) => store.insert(records).await,
        }
    }

    /// `None` means no case has this id. An empty patch returns the stored record as is.
    pub async fn update(&self, id: Uuid, patch: &CasePatch) -> anyhow::Result<Option<CaseRecord>> {
        validate_patch(patch)?;
        let updated = match self {
            CaseStore::Postgres(pool) => db::update_case(pool, id, patch).await?,
            CaseStore::LocalFile(store) => store.update(id, patch).await?,
        };
        if updated.is_some() {
            tracing::debug!(backend = self.backend(), case_id = %id, "updated case");
        }
        Ok(updated)
    }

    pub async fn replace_all(&self, records: Vec<CaseRecord>) -> anyhow::Result<Vec<CaseRecord>> {
        for record in &records {
            validate_case(record)?;
        }
        if let Some(id) = first_duplicate_id(&records) {
            bail!("duplicate case id {id}");
        }
        match self {
            CaseStore::Postgres(pool) => db::replace_cases(pool, &records).await?,
            CaseStore::LocalFile(store) => store.replace_all(&records).await?,
        }
        tracing::info!(backend = self.backend(), count = records.len(), "replaced cases");
        Ok(records)
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        match self {
            CaseStore::Postgres(pool) => db::clear_cases(pool).await?,
            CaseStore::LocalFile(store) => store.clear().await?,
        }
        tracing::info!(backend = self.backend(), "cleared cases");
        Ok(())
    }

    pub async fn record_event(&self, event: Event) -> anyhow::Result<()> {
        match self {
            CaseStore::Postgres(pool) => db::insert_event(pool, &event).await,
            CaseStore::LocalFile(store) => store.record_event(event).await,
        }
    }

    pub async fn recent_events(&self) -> anyhow::Result<Vec<Event>> {
        match self {
            CaseStore::Postgres(pool) => db::fetch_events(pool).await,
            CaseStore::LocalFile(store) => store.recent_events().await,
        }
    }

    pub async fn create(&self, record: CaseRecord, now: DateTime<Utc>) -> anyhow::Result<CaseRecord> {
        validate_case(&record)?;
        self.insert(std::slice::from_ref(&record)).await?;
        self.record_event(new_event(EventAction::Created, &record, now))
            .await?;
        tracing::info!(backend = self.backend(), case_id = %record.id, "created case");
        Ok(record)
    }

    pub async fn apply_quick_action(
        &self,
        id: Uuid,
        action: QuickAction,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<CaseRecord>> {
        let Some(updated) = self.update(id, &action.patch(today)).await? else {
            tracing::warn!(case_id = %id, action = action.event().as_str(), "case not found");
            return Ok(None);
        };
        self.record_event(new_event(action.event(), &updated, now))
            .await?;
        tracing::info!(case_id = %id, action = action.event().as_str(), "applied quick action");
        Ok(Some(updated))
    }

    pub async fn seed(&self, today: NaiveDate) -> anyhow::Result<usize> {
        let samples = sample_cases(today);
        self.insert(&samples).await?;
        tracing::info!(backend = self.backend(), count = samples.len(), "seeded sample cases");
        Ok(samples.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Touch,
    Resolve,
    Reopen,
}

impl QuickAction {
    /// Every quick action counts as contact with the scholar today.
    pub fn patch(self, today: NaiveDate) -> CasePatch {
        let status = match self {
            QuickAction::Touch => None,
            QuickAction::Resolve => Some(Status::Resolved),
            QuickAction::Reopen => Some(Status::Open),
        };
        CasePatch {
            status,
            last_touch: Some(today),
            ..CasePatch::default()
        }
    }

    pub fn event(self) -> EventAction {
        match self {
            QuickAction::Touch => EventAction::Touched,
            QuickAction::Resolve => EventAction::Resolved,
            QuickAction::Reopen => EventAction::Reopened,
        }
    }
}

pub fn validate_case(record: &CaseRecord) -> anyhow::Result<()> {
    let required = [
        ("scholar", record.scholar.as_str()),
        ("summary", record.summary.as_str()),
        ("channel", record.channel.as_str()),
        ("category", record.category.as_str()),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        bail!("missing required fields: {}", missing.join(", "));
    }
    Ok(())
}

/// Required fields may be changed but not blanked.
pub fn validate_patch(patch: &CasePatch) -> anyhow::Result<()> {
    let required = [
        ("scholar", &patch.scholar),
        ("summary", &patch.summary),
        ("channel", &patch.channel),
        ("category", &patch.category),
    ];
    let blanked: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.as_deref().is_some_and(|value| value.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();
    if !blanked.is_empty() {
        bail!("missing required fields: {}", blanked.join(", "));
    }
    Ok(())
}

pub fn sample_cases(today: NaiveDate) -> Vec<CaseRecord> {
    let shift = |days: i64| today + Duration::days(days);
    let sample = |scholar: &str,
                  summary: &str,
                  channel: &str,
                  category: &str,
                  urgency: Urgency,
                  status: Status,
                  owner: Option<&str>,
                  next_step: &str,
                  (created, last_touch, due): (i64, i64, i64)| CaseRecord {
        id: Uuid::new_v4(),
        scholar: scholar.to_string(),
        summary: summary.to_string(),
        channel: channel.to_string(),
        category: category.to_string(),
        urgency,
        status,
        owner: owner.map(str::to_string),
        next_step: Some(next_step.to_string()),
        created: shift(created),
        last_touch: Some(shift(last_touch)),
        due: Some(shift(due)),
    };

    vec![
        sample(
            "Avery Hill",
            "Tuition payment gap for spring term",
            "Email",
            "Financial aid",
            Urgency::High,
            Status::Open,
            Some("Maya"),
            "Confirm balance and send payment plan options",
            (-6, -4, 2),
        ),
        sample(
            "Luis Carter",
            "Housing insecurity update from advisor",
            "Phone",
            "Wellbeing",
            Urgency::Critical,
            Status::Open,
            Some("Jordan"),
            "Escalate to care partner and document resources",
            (-2, -1, 1),
        ),
        sample(
            "Renee Brooks",
            "Laptop repair request stalled",
            "Form",
            "Technology access",
            Urgency::Medium,
            Status::Pending,
            None,
            "Assign owner and confirm loaner availability",
            (-12, -8, -1),
        ),
        sample(
            "Sami Patel",
            "Missed tutoring sessions, check-in needed",
            "Slack",
            "Academic support",
            Urgency::Low,
            Status::Open,
            Some("Nia"),
            "Schedule reset call and confirm attendance plan",
            (-14, -10, 4),
        ),
        sample(
            "Jordan Ellis",
            "Confusion about internship stipend timeline",
            "Email",
            "Program operations",
            Urgency::Medium,
            Status::Open,
            Some("Priya"),
            "Send stipend schedule and confirm payroll contact",
            (-3, -2, 3),
        ),
        sample(
            "Kayla Nguyen",
            "Transportation stipend delay",
            "Email",
            "Program operations",
            Urgency::Medium,
            Status::Open,
            Some("Emil"),
            "Verify payout date and update scholar",
            (-5, -3, 3),
        ),
        sample(
            "Darius Webb",
            "FAFSA correction support needed",
            "Phone",
            "Financial aid",
            Urgency::High,
            Status::Pending,
            Some("Riley"),
            "Schedule 1:1 FAFSA correction walkthrough",
            (-9, -6, 1),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::enrich;
    use crate::priority::tests::{sample_case, today};
    use crate::views;

    fn local_store(dir: &tempfile::TempDir) -> CaseStore {
        CaseStore::LocalFile(LocalStore::new(dir.path()))
    }

    #[test]
    fn validation_names_missing_fields() {
        let mut record = sample_case(Urgency::Low, Status::Open);
        record.summary = " ".into();
        record.channel = String::new();
        let err = validate_case(&record).unwrap_err();
        assert_eq!(err.to_string(), "missing required fields: summary, channel");
    }

    #[test]
    fn quick_actions_touch_today() {
        let resolve = QuickAction::Resolve.patch(today());
        assert_eq!(resolve.status, Some(Status::Resolved));
        assert_eq!(resolve.last_touch, Some(today()));
        assert_eq!(QuickAction::Touch.patch(today()).status, None);
        assert_eq!(QuickAction::Reopen.event(), EventAction::Reopened);
    }

    #[test]
    fn sample_cases_exercise_every_panel() {
        let cases = enrich(&sample_cases(today()), today());
        assert_eq!(cases.len(), 7);
        let metrics = views::metrics(&cases);
        assert_eq!(metrics.total, 7);
        assert_eq!(metrics.unassigned, 1);
        assert_eq!(metrics.overdue, 1);
    }

    #[tokio::test]
    async fn create_then_resolve_logs_events() {
        let dir = tempfile::tempdir().unwrap();
        let store = local_store(&dir);
        let now = Utc::now();

        let record = store
            .create(sample_case(Urgency::High, Status::Open), now)
            .await
            .unwrap();
        let resolved = store
            .apply_quick_action(record.id, QuickAction::Resolve, today(), now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.status, Status::Resolved);

        let events = store.recent_events().await.unwrap();
        let actions: Vec<_> = events.iter().map(|event| event.action).collect();
        assert_eq!(actions, [EventAction::Resolved, EventAction::Created]);

        let missing = store
            .apply_quick_action(Uuid::new_v4(), QuickAction::Touch, today(), now)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn update_assigns_owner_and_clears_due() {
        let dir = tempfile::tempdir().unwrap();
        let store = local_store(&dir);
        let mut record = sample_case(Urgency::High, Status::Open);
        record.owner = None;
        record.due = Some(today());
        let record = store.create(record, Utc::now()).await.unwrap();

        let patch = CasePatch {
            owner: Some("Jordan".into()),
            due: Some(None),
            ..CasePatch::default()
        };
        store.update(record.id, &patch).await.unwrap().unwrap();
        let stored = store.list().await.unwrap().remove(0);
        assert_eq!(stored.owner.as_deref(), Some("Jordan"));
        assert_eq!(stored.due, None);

        let unchanged = store.update(record.id, &CasePatch::default()).await.unwrap();
        assert_eq!(unchanged, Some(stored));
        let missing = store.update(Uuid::new_v4(), &CasePatch::default()).await.unwrap();
        assert!(missing.is_none());

        let blank = CasePatch {
            scholar: Some(" ".into()),
            ..CasePatch::default()
        };
        assert!(store.update(record.id, &blank).await.is_err());
        assert_eq!(store.list().await.unwrap()[0].scholar, record.scholar);
    }

    #[tokio::test]
    async fn replace_all_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = local_store(&dir);
        let first = sample_case(Urgency::Low, Status::Open);
        let mut second = sample_case(Urgency::High, Status::Pending);
        second.id = first.id;

        let err = store.replace_all(vec![first.clone(), second]).await.unwrap_err();
        assert_eq!(err.to_string(), format!("duplicate case id {}", first.id));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_all_rejects_invalid_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = local_store(&dir);
        store.seed(today()).await.unwrap();

        let mut bad = sample_case(Urgency::Low, Status::Open);
        bad.scholar.clear();
        assert!(store.replace_all(vec![bad]).await.is_err());
        assert_eq!(store.list().await.unwrap().len(), 7);

        store
            .replace_all(vec![sample_case(Urgency::Low, Status::Open)])
            .await
            .unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.backend(), "local-file");
    }
}
