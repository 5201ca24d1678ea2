use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::history::store::{list_for_resource, list_recent};
use crate::models::history::HistoryRecord;
use crate::models::resource::ResourceKind;
use crate::resources::{store as resource_store, Resource};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub start: Option<Uuid>,
}

/// GET /api/v1/history
pub async fn handle_recent_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryRecord>>, AppError> {
    Ok(Json(list_recent(&state.db, params.start).await?))
}

/// GET /api/v1/{kind}/:id/history
pub async fn handle_resource_history<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryRecord>>, AppError> {
    Ok(Json(resource_history(&state.db, R::KIND, id).await?))
}

/// 404 unless `id` is a live document of `kind`.
async fn resource_history(
    pool: &PgPool,
    kind: ResourceKind,
    id: Uuid,
) -> Result<Vec<HistoryRecord>, AppError> {
    if resource_store::fetch(pool, kind, id).await?.is_none() {
        return Err(AppError::NotFound(format!("{} {id} not found", kind.as_str())));
    }
    list_for_resource(pool, kind, id).await
}
