use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use super::transform::TransformedEvent;
use crate::google::CalendarApi;

/// The two calendars submissions are published to.
#[derive(Debug, Clone)]
pub struct CalendarTargets {
    pub events: String,
    pub signups: String,
}

impl CalendarTargets {
    pub fn for_event(&self, is_signup: bool) -> &str {
        if is_signup {
            &self.signups
        } else {
            &self.events
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishResult {
    Published { event_id: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishOutcome {
    pub summary: String,
    pub calendar_id: String,
    #[serde(flatten)]
    pub result: PublishResult,
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self.result, PublishResult::Published { .. })
    }
}

/// Inserts every event concurrently. A failed insert never affects its
/// siblings; each event gets its own outcome, in input order.
pub async fn publish(
    calendar: &dyn CalendarApi,
    targets: &CalendarTargets,
    events: &[TransformedEvent],
) -> Vec<PublishOutcome> {
    let inserts = events.iter().map(|event| async move {
        let calendar_id = targets.for_event(event.is_signup);
        let result = match calendar.insert_event(calendar_id, &event.payload()).await {
            Ok(event_id) => {
                info!("Published '{}' to {calendar_id} as {event_id}", event.summary);
                PublishResult::Published { event_id }
            }
            Err(e) => {
                warn!("Failed to publish '{}' to {calendar_id}: {e}", event.summary);
                PublishResult::Failed {
                    error: e.to_string(),
                }
            }
        };
        PublishOutcome {
            summary: event.summary.clone(),
            calendar_id: calendar_id.to_string(),
            result,
        }
    });
    join_all(inserts).await
}
