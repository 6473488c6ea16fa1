use std::path::PathBuf;

/// Core error type for the expense bot.
///
/// Adapter crates should map their specific errors into this type so the bot
/// core can handle failures consistently (fatal at startup vs user-facing reply).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt registry file: {path}: {reason}")]
    CorruptRegistry { path: PathBuf, reason: String },

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Startup errors stop the process before it starts serving.
    pub fn is_startup(&self) -> bool {
        matches!(self, Error::Config(_) | Error::CorruptRegistry { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Tagged failure of a remote spreadsheet call.
///
/// One variant per gateway operation so the handler can map each to its own reply.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("provision failed: {0}")]
    Provision(String),

    #[error("append failed: {0}")]
    Append(String),

    #[error("read failed: {0}")]
    Read(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Malformed command input. Reported inline to the user; never fatal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("an email address is required")]
    MissingEmail,

    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),

    #[error("`{0}` is not a number")]
    NonNumericAmount(String),

    #[error("amount cannot be negative")]
    NegativeAmount,
}
