use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{CALENDAR_EVENT_KEY, CALENDAR_PENDING_KEY};
use crate::errors::AppError;
use crate::models::resource::{ResourceKind, ResourceRow};

pub async fn insert(
    conn: &mut PgConnection,
    kind: ResourceKind,
    id: Uuid,
    data: &Value,
    history: &[Uuid],
) -> Result<ResourceRow, AppError> {
    let row = sqlx::query_as::<_, ResourceRow>(
        r#"
        INSERT INTO resources (id, kind, data, history)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(kind.as_str())
    .bind(data)
    .bind(history)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn fetch(pool: &PgPool, kind: ResourceKind, id: Uuid) -> Result<Option<ResourceRow>, AppError> {
    let row = sqlx::query_as::<_, ResourceRow>("SELECT * FROM resources WHERE id = $1 AND kind = $2")
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Same as [`fetch`] but row-locked until the surrounding transaction ends,
/// so concurrent updates of one document serialize.
pub async fn fetch_for_update(
    conn: &mut PgConnection,
    kind: ResourceKind,
    id: Uuid,
) -> Result<Option<ResourceRow>, AppError> {
    let row = sqlx::query_as::<_, ResourceRow>(
        "SELECT * FROM resources WHERE id = $1 AND kind = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(kind.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// All documents of one kind, oldest first.
pub async fn list(pool: &PgPool, kind: ResourceKind) -> Result<Vec<ResourceRow>, AppError> {
    let rows = sqlx::query_as::<_, ResourceRow>(
        "SELECT * FROM resources WHERE kind = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Replaces the document body and appends `history_id` to its history list.
pub async fn update(
    conn: &mut PgConnection,
    id: Uuid,
    data: &Value,
    history_id: Uuid,
) -> Result<ResourceRow, AppError> {
    let row = sqlx::query_as::<_, ResourceRow>(
        r#"
        UPDATE resources
        SET data = $2, history = array_append(history, $3), updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(data)
    .bind(history_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Returns whether a document was deleted.
pub async fn delete(conn: &mut PgConnection, kind: ResourceKind, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM resources WHERE id = $1 AND kind = $2")
        .bind(id)
        .bind(kind.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Records the published calendar entry and drops the pending claim. Not a
/// user edit, so no history.
pub async fn set_calendar_event_id(
    pool: &PgPool,
    id: Uuid,
    event_id: &str,
) -> Result<ResourceRow, AppError> {
    let row = sqlx::query_as::<_, ResourceRow>(
        r#"
        UPDATE resources
        SET data = (data - $4::text) || jsonb_build_object($2::text, $3::text)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(CALENDAR_EVENT_KEY)
    .bind(event_id)
    .bind(CALENDAR_PENDING_KEY)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Drops the pending claim after a failed insert so a later edit can retry.
pub async fn release_calendar_claim(pool: &PgPool, id: Uuid) -> Result<ResourceRow, AppError> {
    let row = sqlx::query_as::<_, ResourceRow>(
        "UPDATE resources SET data = data - $2::text WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(CALENDAR_PENDING_KEY)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
