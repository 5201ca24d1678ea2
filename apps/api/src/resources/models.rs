use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::Resource;
use crate::errors::AppError;
use crate::models::resource::ResourceKind;
use crate::sync::transform::{format_description, format_title, TransformedEvent};

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_order(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<(), AppError> {
    if end < start {
        return Err(AppError::Validation("end must not be before start".to_string()));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Club
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub advised: bool,
}

impl Resource for Club {
    const KIND: ResourceKind = ResourceKind::Club;

    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)?;
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(AppError::Validation(format!("invalid email '{email}'")));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Event
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub signup: bool,
}

impl Resource for Event {
    const KIND: ResourceKind = ResourceKind::Event;

    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)?;
        require_order(&self.start, &self.end)
    }

    /// Accepted events go on the calendar, formatted like sheet submissions.
    /// Signups are point-in-time entries.
    fn calendar_entry(&self, zone: Tz) -> Option<TransformedEvent> {
        if self.status != EventStatus::Accepted {
            return None;
        }
        let start = self.start.with_timezone(&zone);
        let end = if self.signup {
            start
        } else {
            self.end.with_timezone(&zone)
        };
        Some(TransformedEvent {
            summary: format_title(Some(self.name.as_str()), self.club.as_deref()),
            description: format_description(self.description.as_deref(), self.club.as_deref()),
            location: self.location.clone().filter(|l| !l.trim().is_empty()),
            start,
            end,
            is_signup: self.signup,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Volunteering
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volunteering {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signup_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub filled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Resource for Volunteering {
    const KIND: ResourceKind = ResourceKind::Volunteering;

    fn validate(&self) -> Result<(), AppError> {
        require_text("name", &self.name)?;
        if self.limit == Some(0) {
            return Err(AppError::Validation("limit must be positive".to_string()));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reservation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub club: String,
    pub room: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Resource for Reservation {
    const KIND: ResourceKind = ResourceKind::Reservation;

    fn validate(&self) -> Result<(), AppError> {
        require_text("club", &self.club)?;
        require_text("room", &self.room)?;
        require_order(&self.start, &self.end)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;
    use serde_json::json;

    use super::*;

    fn event(status: &str, signup: bool) -> Event {
        serde_json::from_value(json!({
            "name": "Spring Gala",
            "club": "CHESS",
            "location": "Union Ballroom",
            "start": "2024-04-12T23:00:00Z",
            "end": "2024-04-13T01:00:00Z",
            "status": status,
            "signup": signup,
        }))
        .unwrap()
    }

    #[test]
    fn test_club_requires_name() {
        let club: Club = serde_json::from_value(json!({ "name": "  " })).unwrap();
        assert!(matches!(club.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_club_serializes_camel_case_without_empty_optionals() {
        let club: Club = serde_json::from_value(json!({ "name": "Chess", "advised": true })).unwrap();
        assert!(club.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&club).unwrap(),
            json!({ "name": "Chess", "advised": true })
        );
    }

    #[test]
    fn test_club_rejects_malformed_email() {
        let club: Club =
            serde_json::from_value(json!({ "name": "Chess", "email": "chess.example.edu" })).unwrap();
        assert!(club.validate().is_err());
    }

    #[test]
    fn test_event_defaults_to_pending() {
        let event: Event = serde_json::from_value(json!({
            "name": "Open play",
            "start": "2024-04-12T23:00:00Z",
            "end": "2024-04-12T23:00:00Z",
        }))
        .unwrap();
        assert_eq!(event.status, EventStatus::Pending);
        assert!(!event.signup);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_event_end_before_start_is_rejected() {
        let mut event = event("pending", false);
        event.end = Utc.with_ymd_and_hms(2024, 4, 12, 22, 0, 0).unwrap();
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_pending_event_has_no_calendar_entry() {
        assert!(event("pending", false).calendar_entry(Chicago).is_none());
        assert!(event("rejected", false).calendar_entry(Chicago).is_none());
    }

    #[test]
    fn test_accepted_event_calendar_entry() {
        let entry = event("accepted", false).calendar_entry(Chicago).unwrap();
        assert_eq!(entry.summary, "[CHESS] Spring Gala");
        assert_eq!(
            entry.description,
            "<b>[No description]</b><br><br><i>Added by: CHESS</i>"
        );
        assert_eq!(entry.location.as_deref(), Some("Union Ballroom"));
        assert_eq!(entry.start, Utc.with_ymd_and_hms(2024, 4, 12, 23, 0, 0).unwrap());
        assert_eq!(entry.end, Utc.with_ymd_and_hms(2024, 4, 13, 1, 0, 0).unwrap());
        assert!(!entry.is_signup);
    }

    #[test]
    fn test_accepted_signup_is_point_in_time() {
        let entry = event("accepted", true).calendar_entry(Chicago).unwrap();
        assert!(entry.is_signup);
        assert_eq!(entry.start, entry.end);
    }

    #[test]
    fn test_volunteering_limit_must_be_positive() {
        let slot: Volunteering =
            serde_json::from_value(json!({ "name": "Food drive", "limit": 0 })).unwrap();
        assert!(slot.validate().is_err());
        let slot: Volunteering = serde_json::from_value(json!({
            "name": "Food drive",
            "limit": 12,
            "signupTime": "2024-04-01T15:00:00Z",
        }))
        .unwrap();
        assert!(slot.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&slot).unwrap()["signupTime"],
            json!("2024-04-01T15:00:00Z")
        );
    }

    #[test]
    fn test_reservation_requires_room() {
        let reservation: Reservation = serde_json::from_value(json!({
            "club": "CHESS",
            "room": "",
            "start": "2024-04-12T23:00:00Z",
            "end": "2024-04-13T01:00:00Z",
        }))
        .unwrap();
        assert!(reservation.validate().is_err());
    }
}
