//! Generic CRUD handlers, instantiated once per resource type in the router.
//!
//! Every create/update writes the document and its history record in one
//! transaction. Accepted events are claimed for the calendar inside that
//! transaction (under the row lock on update) and published after commit, so
//! concurrent edits cannot insert the same event twice. Publishing never
//! fails the request.

use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono_tz::Tz;
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::{store, Resource, CALENDAR_EVENT_KEY, CALENDAR_PENDING_KEY};
use crate::errors::AppError;
use crate::history::diff::RESERVED_PREFIX;
use crate::history::{is_reserved_key, record_creation, record_update, store as history_store};
use crate::models::history::Editor;
use crate::models::resource::ResourceRow;
use crate::state::AppState;
use crate::sync::publisher::{self, PublishResult};
use crate::sync::transform::TransformedEvent;

type Document = Map<String, Value>;

/// GET /api/v1/{kind}
pub async fn list<R: Resource>(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    let rows = store::list(&state.db, R::KIND).await?;
    Ok(Json(rows.iter().map(ResourceRow::to_document).collect()))
}

/// GET /api/v1/{kind}/:id
pub async fn get<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let row = store::fetch(&state.db, R::KIND, id)
        .await?
        .ok_or_else(|| not_found::<R>(id))?;
    Ok(Json(row.to_document()))
}

/// POST /api/v1/{kind}
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    editor: Editor,
    Json(payload): Json<Document>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let model: R = parse_model(strip_reserved(payload))?;
    let mut document = to_document(&model)?;

    let id = Uuid::new_v4();
    let record = record_creation(R::KIND, id, &document, editor);
    let claimed = claim_publication(&model, state.sync.settings().time_zone, &mut document);

    let mut tx = state.db.begin().await?;
    let row = store::insert(&mut *tx, R::KIND, id, &Value::Object(document), &[record.id]).await?;
    history_store::insert_record(&mut *tx, &record).await?;
    tx.commit().await?;
    info!("Created {} {id}", R::KIND.as_str());

    let row = publish_claimed::<R>(&state, row, claimed).await;
    Ok((StatusCode::CREATED, Json(row.to_document())))
}

/// PUT /api/v1/{kind}/:id
///
/// The payload is partial. It is merged over the stored document and the
/// result must still be a valid `R`; history covers only the payload's keys.
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    editor: Editor,
    Json(payload): Json<Document>,
) -> Result<Json<Value>, AppError> {
    let incoming = strip_reserved(payload);

    let mut tx = state.db.begin().await?;
    let existing = store::fetch_for_update(&mut *tx, R::KIND, id)
        .await?
        .ok_or_else(|| not_found::<R>(id))?;
    let previous = existing.data_map();

    let model: R = parse_model(merge(&previous, &incoming))?;
    let mut document = to_document(&model)?;
    let changes = normalized_changes(&incoming, &document);
    let record = record_update(R::KIND, id, &previous, &changes, editor);
    carry_reserved(&previous, &mut document);
    let claimed = claim_publication(&model, state.sync.settings().time_zone, &mut document);

    let row = store::update(&mut *tx, id, &Value::Object(document), record.id).await?;
    history_store::insert_record(&mut *tx, &record).await?;
    tx.commit().await?;
    info!(
        "Updated {} {id} ({} field(s) changed)",
        R::KIND.as_str(),
        record.fields.len()
    );

    let row = publish_claimed::<R>(&state, row, claimed).await;
    Ok(Json(row.to_document()))
}

/// DELETE /api/v1/{kind}/:id
///
/// Removes the document together with its history.
pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db.begin().await?;
    if !store::delete(&mut *tx, R::KIND, id).await? {
        return Err(not_found::<R>(id));
    }
    let removed = history_store::delete_for_resource(&mut *tx, id).await?;
    tx.commit().await?;
    info!("Deleted {} {id} and {removed} history record(s)", R::KIND.as_str());
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn not_found<R: Resource>(id: Uuid) -> AppError {
    AppError::NotFound(format!("{} {id} not found", R::KIND.as_str()))
}

fn parse_model<R: Resource>(document: Document) -> Result<R, AppError> {
    let model: R = serde_json::from_value(Value::Object(document))
        .map_err(|e| AppError::Validation(e.to_string()))?;
    model.validate()?;
    Ok(model)
}

/// The model's canonical JSON form, which is what gets stored.
fn to_document<R: Resource>(model: &R) -> Result<Document, AppError> {
    match serde_json::to_value(model).map_err(anyhow::Error::from)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Internal(anyhow!(
            "{} serialized to a non-object: {other}",
            R::KIND.as_str()
        ))),
    }
}

/// Clients cannot write identity or bookkeeping keys.
fn strip_reserved(mut payload: Document) -> Document {
    payload.retain(|key, _| !is_reserved_key(key));
    payload
}

fn merge(previous: &Document, incoming: &Document) -> Document {
    let mut merged: Document = previous
        .iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    merged.extend(incoming.iter().map(|(key, value)| (key.clone(), value.clone())));
    merged
}

/// Payload keys mapped to their normalized values. Keys the model dropped
/// (unknown keys, cleared optionals) map to null.
fn normalized_changes(incoming: &Document, document: &Document) -> Document {
    incoming
        .keys()
        .map(|key| (key.clone(), document.get(key).cloned().unwrap_or(Value::Null)))
        .collect()
}

fn carry_reserved(previous: &Document, document: &mut Document) {
    for (key, value) in previous {
        if key.starts_with(RESERVED_PREFIX) {
            document.insert(key.clone(), value.clone());
        }
    }
}

/// Claims the calendar insert for this write by marking `document` pending.
/// Returns the entry to publish, or `None` if the document is already
/// published, already claimed, or not calendar-worthy.
fn claim_publication<R: Resource>(model: &R, zone: Tz, document: &mut Document) -> Option<TransformedEvent> {
    if document.contains_key(CALENDAR_EVENT_KEY) || document.contains_key(CALENDAR_PENDING_KEY) {
        return None;
    }
    let entry = model.calendar_entry(zone)?;
    document.insert(CALENDAR_PENDING_KEY.to_string(), Value::Bool(true));
    Some(entry)
}

async fn publish_claimed<R: Resource>(
    state: &AppState,
    row: ResourceRow,
    claimed: Option<TransformedEvent>,
) -> ResourceRow {
    let Some(entry) = claimed else {
        return row;
    };

    let outcomes = publisher::publish(
        state.calendar.as_ref(),
        &state.sync.settings().targets,
        std::slice::from_ref(&entry),
    )
    .await;
    let result = match outcomes.into_iter().next().map(|o| o.result) {
        Some(PublishResult::Published { event_id }) => {
            store::set_calendar_event_id(&state.db, row.id, &event_id).await
        }
        _ => store::release_calendar_claim(&state.db, row.id).await,
    };

    match result {
        Ok(updated) => updated,
        Err(e) => {
            warn!(
                "Could not record calendar state for {} {}: {e}",
                R::KIND.as_str(),
                row.id
            );
            row
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono_tz::America::Chicago;
    use serde_json::json;

    use super::*;
    use crate::resources::{Club, Event, EventStatus};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_strip_reserved_drops_identity_and_bookkeeping() {
        let stripped = strip_reserved(doc(json!({
            "id": "x",
            "history": [],
            "_calendarEventId": "evt",
            "name": "Chess",
        })));
        assert_eq!(stripped, doc(json!({ "name": "Chess" })));
    }

    #[test]
    fn test_merge_overlays_payload_and_skips_reserved() {
        let merged = merge(
            &doc(json!({ "name": "Chess", "advised": false, "_calendarEventId": "evt" })),
            &doc(json!({ "advised": true })),
        );
        assert_eq!(merged, doc(json!({ "name": "Chess", "advised": true })));
    }

    #[test]
    fn test_partial_update_must_still_validate() {
        let merged = merge(&doc(json!({ "name": "Chess" })), &doc(json!({ "name": "" })));
        assert!(matches!(parse_model::<Club>(merged), Err(AppError::Validation(_))));

        let merged = merge(&doc(json!({ "name": "Chess" })), &doc(json!({ "name": null })));
        assert!(matches!(parse_model::<Club>(merged), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_changes_use_normalized_values() {
        let model: Event = parse_model(doc(json!({
            "name": "Gala",
            "start": "2024-04-12T18:00:00-05:00",
            "end": "2024-04-12T20:00:00-05:00",
            "location": null,
            "bogus": 1,
        })))
        .unwrap();
        let document = to_document(&model).unwrap();
        let changes = normalized_changes(
            &doc(json!({ "start": "2024-04-12T18:00:00-05:00", "location": null, "bogus": 1 })),
            &document,
        );
        assert_eq!(changes["start"], json!("2024-04-12T23:00:00Z"));
        assert_eq!(changes["location"], Value::Null);
        assert_eq!(changes["bogus"], Value::Null);
    }

    fn accepted_event() -> Event {
        parse_model(doc(json!({
            "name": "Gala",
            "start": "2024-04-12T23:00:00Z",
            "end": "2024-04-13T01:00:00Z",
            "status": "accepted",
        })))
        .unwrap()
    }

    #[test]
    fn test_accepted_event_is_claimed_once() {
        let event = accepted_event();
        let mut document = to_document(&event).unwrap();

        let entry = claim_publication(&event, Chicago, &mut document).unwrap();
        assert_eq!(entry.summary, "Gala");
        assert_eq!(document[CALENDAR_PENDING_KEY], true);

        // A concurrent edit sees the carried claim and leaves publishing alone.
        let mut next = to_document(&event).unwrap();
        carry_reserved(&document, &mut next);
        assert!(claim_publication(&event, Chicago, &mut next).is_none());
    }

    #[test]
    fn test_published_event_is_not_claimed() {
        let event = accepted_event();
        let mut document = to_document(&event).unwrap();
        document.insert(CALENDAR_EVENT_KEY.to_string(), json!("evt-1"));
        assert!(claim_publication(&event, Chicago, &mut document).is_none());
        assert!(!document.contains_key(CALENDAR_PENDING_KEY));
    }

    #[test]
    fn test_pending_event_is_not_claimed() {
        let mut event = accepted_event();
        event.status = EventStatus::Pending;
        let mut document = to_document(&event).unwrap();
        assert!(claim_publication(&event, Chicago, &mut document).is_none());
        assert!(!document.contains_key(CALENDAR_PENDING_KEY));
    }

    #[test]
    fn test_reserved_keys_survive_an_update() {
        let mut document = doc(json!({ "name": "Gala" }));
        carry_reserved(
            &doc(json!({ "name": "Old", "_calendarEventId": "evt-1" })),
            &mut document,
        );
        assert_eq!(document["_calendarEventId"], "evt-1");
        assert_eq!(document["name"], "Gala");
    }
}
