use anyhow::Context;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::activity::EVENT_LOG_CAP;
use crate::models::{CasePatch, CaseRecord, Event, EventAction, Status, Urgency};

const CASE_COLUMNS: &str = "id, scholar, summary, channel, category, urgency, status, owner, \
                            next_step, created, last_touch, due";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn ping(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Postgres did not answer")?;
    Ok(())
}

fn case_from_row(row: &PgRow) -> CaseRecord {
    CaseRecord {
        id: row.get("id"),
        scholar: row.get("scholar"),
        summary: row.get("summary"),
        channel: row.get("channel"),
        category: row.get("category"),
        urgency: Urgency::parse(row.get("urgency")),
        status: Status::parse(row.get("status")),
        owner: row.get("owner"),
        next_step: row.get("next_step"),
        created: row.get("created"),
        last_touch: row.get("last_touch"),
        due: row.get("due"),
    }
}

pub async fn fetch_cases(pool: &PgPool) -> anyhow::Result<Vec<CaseRecord>> {
    let query = format!(
        "SELECT {CASE_COLUMNS} FROM support_triage.cases ORDER BY created DESC, created_at DESC"
    );
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(rows.iter().map(case_from_row).collect())
}

async fn insert_case(
    tx: &mut Transaction<'_, Postgres>,
    record: &CaseRecord,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO support_triage.cases
        (id, scholar, summary, channel, category, urgency, status, owner, next_step, created, last_touch, due)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(record.id)
    .bind(&record.scholar)
    .bind(&record.summary)
    .bind(&record.channel)
    .bind(&record.category)
    .bind(record.urgency.as_str())
    .bind(record.status.as_str())
    .bind(&record.owner)
    .bind(&record.next_step)
    .bind(record.created)
    .bind(record.last_touch)
    .bind(record.due)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("failed to insert case {}", record.id))?;
    Ok(())
}

pub async fn insert_cases(pool: &PgPool, records: &[CaseRecord]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    for record in records {
        insert_case(&mut tx, record).await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn update_case(
    pool: &PgPool,
    id: Uuid,
    patch: &CasePatch,
) -> anyhow::Result<Option<CaseRecord>> {
    let mut tx = pool.begin().await?;
    let query = format!("SELECT {CASE_COLUMNS} FROM support_triage.cases WHERE id = $1 FOR UPDATE");
    let Some(row) = sqlx::query(&query).bind(id).fetch_optional(&mut *tx).await? else {
        return Ok(None);
    };

    let mut record = case_from_row(&row);
    patch.apply(&mut record);

    sqlx::query(
        r#"
        UPDATE support_triage.cases
        SET scholar = $2, summary = $3, channel = $4, category = $5, urgency = $6,
            status = $7, owner = $8, next_step = $9, created = $10, last_touch = $11,
            due = $12, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(record.id)
    .bind(&record.scholar)
    .bind(&record.summary)
    .bind(&record.channel)
    .bind(&record.category)
    .bind(record.urgency.as_str())
    .bind(record.status.as_str())
    .bind(&record.owner)
    .bind(&record.next_step)
    .bind(record.created)
    .bind(record.last_touch)
    .bind(record.due)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Some(record))
}

pub async fn replace_cases(pool: &PgPool, records: &[CaseRecord]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM support_triage.cases")
        .execute(&mut *tx)
        .await?;
    for record in records {
        insert_case(&mut tx, record).await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn clear_cases(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("TRUNCATE support_triage.cases")
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_event(pool: &PgPool, event: &Event) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO support_triage.events
        (id, action, at, case_id, scholar, owner, urgency, detail)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(event.id)
    .bind(event.action.as_str())
    .bind(event.at)
    .bind(event.case_id)
    .bind(&event.scholar)
    .bind(&event.owner)
    .bind(event.urgency.as_str())
    .bind(&event.detail)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        DELETE FROM support_triage.events
        WHERE id NOT IN (
            SELECT id FROM support_triage.events ORDER BY at DESC LIMIT $1
        )
        "#,
    )
    .bind(EVENT_LOG_CAP as i64)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn fetch_events(pool: &PgPool) -> anyhow::Result<Vec<Event>> {
    let rows = sqlx::query(
        r#"
        SELECT id, action, at, case_id, scholar, owner, urgency, detail
        FROM support_triage.events
        ORDER BY at DESC
        LIMIT $1
        "#,
    )
    .bind(EVENT_LOG_CAP as i64)
    .fetch_all(pool)
    .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let raw_action: String = row.get("action");
        let Some(action) = EventAction::parse(&raw_action) else {
            tracing::warn!(action = %raw_action, "skipping event with unknown action");
            continue;
        };
        events.push(Event {
            id: row.get("id"),
            action,
            at: row.get("at"),
            case_id: row.get("case_id"),
            scholar: row.get("scholar"),
            owner: row.get("owner"),
            urgency: Urgency::parse(row.get("urgency")),
            detail: row.get("detail"),
        });
    }
    Ok(events)
}
