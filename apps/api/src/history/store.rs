use anyhow::anyhow;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::history::{HistoryRecord, HistoryRow};
use crate::models::resource::ResourceKind;

/// Page size of the global history feed.
pub const RECENT_LIMIT: i64 = 50;

/// Inserts one record. Callers run this inside the same transaction as the
/// resource write it describes.
pub async fn insert_record(conn: &mut PgConnection, record: &HistoryRecord) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO history (id, resource, resource_id, time, editor_id, editor_ip, fields)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(record.id)
    .bind(record.resource.as_str())
    .bind(record.resource_id)
    .bind(record.time)
    .bind(record.editor.editor_id())
    .bind(record.editor.editor_ip())
    .bind(Json(&record.fields))
    .execute(conn)
    .await?;
    Ok(())
}

/// Most recent records across all resources, newest first. With `start`, only
/// records strictly older than that record are returned.
pub async fn list_recent(pool: &PgPool, start: Option<Uuid>) -> Result<Vec<HistoryRecord>, AppError> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT * FROM history
        WHERE $1::uuid IS NULL
           OR (time, id) < (SELECT time, id FROM history WHERE id = $1)
        ORDER BY time DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(start)
    .bind(RECENT_LIMIT)
    .fetch_all(pool)
    .await?;
    into_records(rows)
}

/// Full history of one resource of the given kind, oldest first.
pub async fn list_for_resource(
    pool: &PgPool,
    resource: ResourceKind,
    resource_id: Uuid,
) -> Result<Vec<HistoryRecord>, AppError> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        "SELECT * FROM history WHERE resource_id = $1 AND resource = $2 ORDER BY time ASC, id ASC",
    )
    .bind(resource_id)
    .bind(resource.as_str())
    .fetch_all(pool)
    .await?;
    into_records(rows)
}

pub async fn delete_for_resource(conn: &mut PgConnection, resource_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM history WHERE resource_id = $1")
        .bind(resource_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

fn into_records(rows: Vec<HistoryRow>) -> Result<Vec<HistoryRecord>, AppError> {
    rows.into_iter()
        .map(|row| HistoryRecord::try_from(row).map_err(|e| AppError::Internal(anyhow!(e))))
        .collect()
}
