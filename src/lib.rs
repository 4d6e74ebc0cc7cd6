//! # xharvest
//!
//! A client for the X/Twitter web GraphQL API. It keeps one cookie-authenticated
//! session alive across calls and flattens the API's nested timeline responses
//! into plain tweet records.
//!
//! ## Features
//!
//! - Session handling: cookies loaded from disk or obtained through a pluggable
//!   [`Authenticator`], persisted (optionally encrypted) and re-created on auth failure
//! - Resilient requests: waits out rate-limit windows, re-authenticates on
//!   401/403 and on the API's silent empty-user response
//! - Timeline normalization: instructions → entries → flat [`TweetRecord`]s with
//!   author, quoted and retweeted tweets resolved
//! - Structured logging through the `log` facade
//!
//! ## Configuration
//!
//! See [`ScraperConfig::from_env`] for the environment variables, or
//! [`ScraperConfig::from_file`] for the JSON config file.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xharvest::{CookieImportAuthenticator, ScraperConfig, TwitterClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xharvest::ScraperError> {
//!     let config = ScraperConfig::from_env()?;
//!     let authenticator = Arc::new(CookieImportAuthenticator::new("browser-cookies.json"));
//!     let client = TwitterClient::new(config, authenticator)?;
//!
//!     for tweet in client.search("rust lang", 20, None).await? {
//!         println!("{:?}: {:?}", tweet.id(), tweet.get("full_text"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod session;
pub mod store;
pub mod twitter;

// Re-export commonly used types and functions
pub use auth::{build_bearer_auth_header, Authenticator, CookieImportAuthenticator};
pub use config::{Credentials, ScraperConfig};
pub use error::{Result, ScraperError};
pub use session::{Session, SessionCookie, SessionManager};
pub use store::SessionStore;
pub use twitter::{
    extract, normalize, Operation, RequestExecutor, TimelinePage, TweetRecord, TwitterClient,
};

#[cfg(test)]
mod tests;
