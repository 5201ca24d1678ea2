//! Google API client: Drive metadata, Sheets values and Calendar inserts.
//!
//! All Google traffic goes through `GoogleClient`. The sync pipeline and the
//! event handlers only see the `SpreadsheetApi` / `CalendarApi` traits so they
//! can run against in-memory fakes in tests.
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

pub mod auth;
pub mod calendar;
pub mod sheets;

pub use auth::TokenSource;
pub use calendar::{CalendarApi, EventDateTime, EventPayload};
pub use sheets::SpreadsheetApi;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid request URL: {0}")]
    Url(String),
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

/// Base URLs for the three Google services. Overridable so tests can point
/// the client at a mock server.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub drive: String,
    pub sheets: String,
    pub calendar: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            drive: DRIVE_API_BASE.to_string(),
            sheets: SHEETS_API_BASE.to_string(),
            calendar: CALENDAR_API_BASE.to_string(),
        }
    }
}

impl ApiEndpoints {
    /// Points every service at the same base URL.
    pub fn uniform(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            drive: format!("{base}/drive/v3"),
            sheets: format!("{base}/v4"),
            calendar: format!("{base}/calendar/v3"),
        }
    }
}

#[derive(Clone)]
pub struct GoogleClient {
    client: Client,
    tokens: TokenSource,
    endpoints: ApiEndpoints,
}

impl GoogleClient {
    pub fn new(
        tokens: TokenSource,
        endpoints: ApiEndpoints,
        timeout: Duration,
    ) -> Result<Self, GoogleError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            tokens,
            endpoints,
        })
    }

    /// Builds `{base}/{segment}/{segment}...`, percent-encoding each segment.
    fn url(base: &str, segments: &[&str]) -> Result<Url, GoogleError> {
        let mut url = Url::parse(base).map_err(|e| GoogleError::Url(format!("{base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GoogleError::Url(format!("{base} cannot be a base URL")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, GoogleError> {
        let token = self.tokens.access_token(&self.client).await?;
        Ok(request.bearer_auth(token))
    }

    /// Sends the request and decodes a JSON body, mapping non-2xx statuses to
    /// `GoogleError::Api`.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GoogleError> {
        let response = self.authorized(request).await?.send().await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn check_status(response: Response) -> Result<Response, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("Google API returned {status}: {body}");
    let message = serde_json::from_str::<GoogleErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(GoogleError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_sheet_ranges() {
        let url = GoogleClient::url(
            "https://sheets.googleapis.com/v4",
            &["spreadsheets", "abc", "values", "Form Responses 1!L1"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/Form%20Responses%201!L1"
        );
    }

    #[test]
    fn test_url_encodes_calendar_ids() {
        let url = GoogleClient::url(
            "https://www.googleapis.com/calendar/v3/",
            &["calendars", "club#events@group.calendar.google.com", "events"],
        )
        .unwrap();
        assert!(url.as_str().contains("club%23events@group.calendar.google.com"));
    }

    #[test]
    fn test_uniform_endpoints() {
        let endpoints = ApiEndpoints::uniform("http://127.0.0.1:9000/");
        assert_eq!(endpoints.sheets, "http://127.0.0.1:9000/v4");
        assert_eq!(endpoints.drive, "http://127.0.0.1:9000/drive/v3");
    }
}
