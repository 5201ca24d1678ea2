use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub google: GoogleCredentials,
    pub google_timeout: Duration,
    pub sync: SyncConfig,
}

/// How the service authenticates against the Google APIs.
#[derive(Debug, Clone)]
pub enum GoogleCredentials {
    /// A pre-issued bearer token, mostly for local runs.
    AccessToken(String),
    /// OAuth client + refresh token; access tokens are minted on demand.
    Refresh {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub enabled: bool,
    pub sheet_id: String,
    pub sheet_name: String,
    pub progress_cell: String,
    pub events_calendar_id: String,
    pub signups_calendar_id: String,
    pub time_zone: Tz,
    pub interval: Duration,
    pub cycle_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            google: google_credentials()?,
            google_timeout: parse_secs("GOOGLE_TIMEOUT_SECS", 30)?,
            sync: SyncConfig {
                enabled: parse_env("SYNC_ENABLED", true)?,
                sheet_id: require_env("SHEET_ID")?,
                sheet_name: optional_env("SHEET_NAME", "Form Responses 1"),
                progress_cell: optional_env("SHEET_PROGRESS_CELL", "L1"),
                events_calendar_id: require_env("EVENTS_CALENDAR_ID")?,
                signups_calendar_id: require_env("SIGNUPS_CALENDAR_ID")?,
                time_zone: parse_time_zone(&optional_env("SYNC_TIME_ZONE", "America/Chicago"))?,
                interval: parse_secs("SYNC_INTERVAL_SECS", 10)?,
                cycle_timeout: parse_secs("SYNC_CYCLE_TIMEOUT_SECS", 120)?,
            },
        })
    }
}

fn google_credentials() -> Result<GoogleCredentials> {
    if let Ok(token) = std::env::var("GOOGLE_ACCESS_TOKEN") {
        return Ok(GoogleCredentials::AccessToken(token));
    }
    match (
        std::env::var("GOOGLE_CLIENT_ID"),
        std::env::var("GOOGLE_CLIENT_SECRET"),
        std::env::var("GOOGLE_REFRESH_TOKEN"),
    ) {
        (Ok(client_id), Ok(client_secret), Ok(refresh_token)) => Ok(GoogleCredentials::Refresh {
            client_id,
            client_secret,
            refresh_token,
        }),
        _ => bail!(
            "Google credentials missing: set GOOGLE_ACCESS_TOKEN or \
             GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN"
        ),
    }
}

pub(crate) fn parse_time_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("SYNC_TIME_ZONE '{name}' is not a valid IANA zone: {e}"))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// A whole number of seconds; zero is rejected.
fn parse_secs(key: &str, default: u64) -> Result<Duration> {
    let secs = parse_env(key, default)?;
    if secs == 0 {
        bail!("{key} must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}
