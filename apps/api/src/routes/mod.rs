pub mod health;

use axum::{routing::get, Router};

use crate::history::handlers as history;
use crate::resources::{handlers, Club, Event, Reservation, Resource, Volunteering};
use crate::state::AppState;
use crate::sync::handlers as sync;

/// CRUD + history routes shared by every resource type.
fn resource_routes<R: Resource>() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list::<R>).post(handlers::create::<R>))
        .route(
            "/:id",
            get(handlers::get::<R>)
                .put(handlers::update::<R>)
                .delete(handlers::delete::<R>),
        )
        .route("/:id/history", get(history::handle_resource_history::<R>))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/v1/clubs", resource_routes::<Club>())
        .nest("/api/v1/events", resource_routes::<Event>())
        .nest("/api/v1/volunteering", resource_routes::<Volunteering>())
        .nest("/api/v1/reservations", resource_routes::<Reservation>())
        .route("/api/v1/history", get(history::handle_recent_history))
        .route("/api/v1/sync/status", get(sync::handle_sync_status))
        .with_state(state)
}
