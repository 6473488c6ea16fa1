use std::{env, path::PathBuf};

use crate::{errors::Error, Result};

const DEFAULT_SUMMARY_RECENT_LIMIT: usize = 5;

/// Service-account credential for the spreadsheet API.
#[derive(Clone)]
pub struct ServiceAccount {
    pub project_id: String,
    pub private_key_id: String,
    /// PEM-encoded RSA private key with real newlines.
    pub private_key: String,
    pub client_email: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .finish()
    }
}

/// Typed process configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub service_account: ServiceAccount,
    pub registry_path: PathBuf,
    pub summary_recent_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Existing env vars win over `.env`; a missing file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (env, map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .and_then(non_empty)
                .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
        };

        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;

        let service_account = ServiceAccount {
            project_id: required("GOOGLE_SHEET_PROJECT_ID")?,
            private_key_id: required("GOOGLE_SHEET_PRIVATE_KEY_ID")?,
            private_key: unescape_newlines(&required("GOOGLE_SHEET_PRIVATE_KEY")?),
            client_email: required("GOOGLE_SHEET_CLIENT_EMAIL")?,
        };

        let registry_path = PathBuf::from(required("REGISTRY_FILE_PATH")?);

        let summary_recent_limit = match lookup("SUMMARY_RECENT_LIMIT").and_then(non_empty) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!(
                    "SUMMARY_RECENT_LIMIT must be a non-negative integer, got `{raw}`"
                ))
            })?,
            None => DEFAULT_SUMMARY_RECENT_LIMIT,
        };

        Ok(Self {
            telegram_bot_token,
            service_account,
            registry_path,
            summary_recent_limit,
        })
    }
}

/// Env files usually carry the PEM on one line with literal `\n`.
fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
