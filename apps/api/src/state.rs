use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::google::CalendarApi;
use crate::sync::SyncJob;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Used by the event handlers to publish accepted events.
    pub calendar: Arc<dyn CalendarApi>,
    /// The spreadsheet sync job; handlers only read its status.
    pub sync: Arc<SyncJob>,
}
