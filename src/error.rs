//! Error types for the xharvest crate.
//!
//! Every fallible operation returns [`ScraperError`]. Shape problems inside a
//! timeline response are never errors; they only produce fewer records.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScraperError>;

#[derive(Debug, Error)]
pub enum ScraperError {
    /// Missing or invalid configuration, e.g. no credentials for a fresh login.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The Authenticator failed to produce a cookie set.
    #[error("Login failed: {0}")]
    Login(String),

    /// Network-level failure talking to the API.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-auth HTTP error status, surfaced without retry.
    #[error("API error (status {status}): {body}")]
    Http { status: u16, body: String },

    /// The auth retry budget ran out on a 401/403 or an empty-user response.
    #[error("Authentication retries exhausted (status {status}): {body}")]
    AuthExhausted { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Reading, writing or deleting the persisted cookie file failed.
    #[error("Session persistence error: {0}")]
    Persistence(String),

    #[error("Encryption error: {0}")]
    Crypto(String),
}

impl ScraperError {
    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ScraperError::Http { status, .. } | ScraperError::AuthExhausted { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ScraperError {
    fn from(err: reqwest::Error) -> Self {
        ScraperError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ScraperError {
    fn from(err: serde_json::Error) -> Self {
        ScraperError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ScraperError {
    fn from(err: std::io::Error) -> Self {
        ScraperError::Persistence(err.to_string())
    }
}
