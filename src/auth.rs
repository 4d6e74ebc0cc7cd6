//! Authentication seam for the cookie-based web session.
//!
//! Logging in through the browser flow is an external concern: this module only
//! defines the [`Authenticator`] capability the session manager calls when no
//! usable session exists, plus the Authorization header every web API call carries.

use async_trait::async_trait;
use log::{info, warn};
use std::path::PathBuf;

use crate::config::Credentials;
use crate::error::{Result, ScraperError};
use crate::session::SessionCookie;
use crate::store::read_cookie_file;

/// Produces a fresh cookie set for the given credentials.
///
/// Implementations may be slow or interactive (a headless browser, a human
/// solving a challenge). A failure must be reported as [`ScraperError::Login`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<Vec<SessionCookie>>;
}

/// An [`Authenticator`] that imports a cookie export instead of driving a login.
///
/// The file is a JSON array of cookie objects as written by browser cookie
/// export extensions or by a previous run of this crate.
#[derive(Debug, Clone)]
pub struct CookieImportAuthenticator {
    path: PathBuf,
}

impl CookieImportAuthenticator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CookieImportAuthenticator { path: path.into() }
    }
}

#[async_trait]
impl Authenticator for CookieImportAuthenticator {
    async fn login(&self, credentials: &Credentials) -> Result<Vec<SessionCookie>> {
        info!(
            "Importing cookies for {} from {}",
            credentials.username,
            self.path.display()
        );

        let cookies = read_cookie_file(&self.path).await.map_err(|e| {
            ScraperError::Login(format!(
                "cannot import cookies from {}: {}",
                self.path.display(),
                e
            ))
        })?;

        if !cookies.iter().any(|c| c.name == "auth_token") {
            warn!("Imported cookie set has no auth_token cookie, the session is likely logged out");
        }

        Ok(cookies)
    }
}

/// Builds the Authorization header for the web app's bearer token.
///
/// # Example
///
/// ```rust
/// use xharvest::build_bearer_auth_header;
///
/// let header = build_bearer_auth_header("your_bearer_token");
/// assert_eq!(header, "Bearer your_bearer_token");
/// ```
pub fn build_bearer_auth_header(bearer_token: &str) -> String {
    format!("Bearer {}", bearer_token)
}
