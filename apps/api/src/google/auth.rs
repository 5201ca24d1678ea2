use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;

use super::{check_status, GoogleError};
use crate::config::GoogleCredentials;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Refresh this long before Google's stated expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Supplies bearer tokens for Google API calls.
#[derive(Clone)]
pub enum TokenSource {
    Static(String),
    Refresh {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_url: String,
        cached: Arc<Mutex<Option<CachedToken>>>,
    },
}

impl TokenSource {
    pub fn from_credentials(credentials: &GoogleCredentials) -> Self {
        match credentials {
            GoogleCredentials::AccessToken(token) => TokenSource::Static(token.clone()),
            GoogleCredentials::Refresh {
                client_id,
                client_secret,
                refresh_token,
            } => TokenSource::Refresh {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                refresh_token: refresh_token.clone(),
                token_url: TOKEN_URL.to_string(),
                cached: Arc::new(Mutex::new(None)),
            },
        }
    }

    /// Returns a valid access token, refreshing it if the cached one is
    /// missing or about to expire.
    pub async fn access_token(&self, client: &Client) -> Result<String, GoogleError> {
        let (client_id, client_secret, refresh_token, token_url, cached) = match self {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Refresh {
                client_id,
                client_secret,
                refresh_token,
                token_url,
                cached,
            } => (client_id, client_secret, refresh_token, token_url, cached),
        };

        let mut guard = cached.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let response = client
            .post(token_url.as_str())
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| GoogleError::Auth(format!("token refresh request failed: {e}")))?;
        let response = check_status(response)
            .await
            .map_err(|e| GoogleError::Auth(e.to_string()))?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::Auth(format!("malformed token response: {e}")))?;

        info!("Refreshed Google access token (expires in {}s)", token.expires_in);
        let expires_at = Utc::now() + Duration::seconds(token.expires_in - EXPIRY_SKEW_SECS);
        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }
}
