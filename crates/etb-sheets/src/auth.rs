//! Service-account OAuth (JWT bearer grant).

use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use etb_core::{config::ServiceAccount, errors::Error, Result};

pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";

const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Clone, Debug)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Signs assertions with the service-account key and caches the access token.
pub struct ServiceAccountAuth {
    client_email: String,
    key_id: String,
    key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Parses the key and signs one assertion so a bad credential fails at startup.
    pub fn new(account: &ServiceAccount, http: reqwest::Client) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| Error::Config(format!("invalid GOOGLE_SHEET_PRIVATE_KEY: {e}")))?;

        let auth = Self {
            client_email: account.client_email.clone(),
            key_id: account.private_key_id.clone(),
            key,
            http,
            cached: Mutex::new(None),
        };
        auth.assertion(chrono::Utc::now().timestamp())
            .map_err(|e| Error::Config(format!("cannot sign with service account key: {e}")))?;
        Ok(auth)
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub(crate) fn claims(&self, now: i64) -> Claims {
        Claims {
            iss: self.client_email.clone(),
            scope: SCOPES.to_string(),
            aud: TOKEN_URI.to_string(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }

    pub(crate) fn assertion(&self, now: i64) -> std::result::Result<String, String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());
        jsonwebtoken::encode(&header, &self.claims(now), &self.key).map_err(|e| e.to_string())
    }

    /// Current access token, exchanging a fresh assertion when needed.
    pub async fn access_token(&self) -> std::result::Result<String, String> {
        let mut cached = self.cached.lock().await;
        if let Some(t) = cached.as_ref() {
            if Instant::now() + EXPIRY_SLACK < t.expires_at {
                return Ok(t.token.clone());
            }
        }

        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let resp = self
            .http
            .post(TOKEN_URI)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("token request error: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(format!(
                "token exchange failed: {status} {}",
                body.chars().take(200).collect::<String>()
            ));
        }

        let tr: TokenResponse = resp
            .json()
            .await
            .map_err(|e| format!("token json error: {e}"))?;

        tracing::debug!(expires_in = tr.expires_in, "obtained spreadsheet access token");
        *cached = Some(CachedToken {
            token: tr.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(tr.expires_in),
        });
        Ok(tr.access_token)
    }
}
