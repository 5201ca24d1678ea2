//! Club-facing documents: clubs, events, volunteering slots and room
//! reservations. All four share one table and one set of generic handlers;
//! the typed models only decide shape, validation and calendar publishing.

use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::resource::ResourceKind;
use crate::sync::transform::TransformedEvent;

pub mod handlers;
pub mod models;
pub mod store;

pub use models::{Club, Event, EventStatus, Reservation, Volunteering};

/// Reserved document key holding the id of the published calendar entry.
pub const CALENDAR_EVENT_KEY: &str = "_calendarEventId";
/// Set in the same transaction that decides to publish; cleared once the
/// insert has succeeded or failed.
pub const CALENDAR_PENDING_KEY: &str = "_calendarPending";

pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn validate(&self) -> Result<(), AppError>;

    /// Calendar entry to publish for this document, if it should appear on a
    /// calendar. Only consulted while the document is neither published nor
    /// claimed for publishing.
    fn calendar_entry(&self, _zone: Tz) -> Option<TransformedEvent> {
        None
    }
}
