use axum::{extract::State, Json};

use crate::state::AppState;
use crate::sync::job::SyncStatus;

/// GET /api/v1/sync/status
pub async fn handle_sync_status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.sync.status().await)
}
