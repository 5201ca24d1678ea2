use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use super::{GoogleClient, GoogleError};

/// Insert-only access to Google Calendar.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Creates the event and returns the id Google assigned to it.
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventPayload,
    ) -> Result<String, GoogleError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl EventDateTime {
    pub fn from_instant<Tz: TimeZone>(instant: &DateTime<Tz>, time_zone: &str) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            date_time: instant.to_rfc3339(),
            time_zone: time_zone.to_string(),
        }
    }
}

/// Body of `events.insert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: String,
}

#[async_trait]
impl CalendarApi for GoogleClient {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventPayload,
    ) -> Result<String, GoogleError> {
        let url = Self::url(&self.endpoints.calendar, &["calendars", calendar_id, "events"])?;
        let inserted: InsertedEvent = self.send_json(self.client.post(url).json(event)).await?;
        Ok(inserted.id)
    }
}
