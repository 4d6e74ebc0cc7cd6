//! Session management for the cookie-authenticated web API.
//!
//! The [`SessionManager`] owns the single active [`Session`], the HTTP transport,
//! and the persisted cookie file. Creating and discarding the session is
//! serialized behind an async mutex so that two callers failing on the same
//! stale session trigger one re-login, not two.

use cookie::Cookie;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::{build_bearer_auth_header, Authenticator};
use crate::config::{mask_secret, ScraperConfig};
use crate::error::{Result, ScraperError};
use crate::store::SessionStore;
use crate::twitter::BEARER_TOKEN;

/// Name of the cookie holding the CSRF token.
pub const CSRF_COOKIE: &str = "ct0";

/// One browser cookie as produced by the login flow.
///
/// Unknown attributes are kept in `extra` so that writing the cookie back to
/// disk does not lose them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default, rename = "httpOnly", skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, rename = "sameSite", skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        SessionCookie {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            http_only: None,
            secure: None,
            same_site: None,
            extra: Map::new(),
        }
    }
}

/// An authenticated cookie set.
///
/// Sessions are immutable; re-authentication replaces the whole value with a
/// new one carrying a higher `generation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    generation: u64,
    cookies: Vec<SessionCookie>,
}

impl Session {
    pub fn new(generation: u64, cookies: Vec<SessionCookie>) -> Self {
        Session {
            generation,
            cookies,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    /// Value of the named cookie. The last occurrence wins, like a browser jar
    /// that received the cookie twice.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .rev()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.cookie(CSRF_COOKIE).filter(|v| !v.is_empty())
    }

    /// Renders the `Cookie` request header value (`a=1; b=2`).
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| Cookie::new(c.name.as_str(), c.value.as_str()).stripped().to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

struct SessionState {
    current: Option<Arc<Session>>,
    generation: u64,
}

/// Owner of the single active session.
pub struct SessionManager {
    config: ScraperConfig,
    authenticator: Arc<dyn Authenticator>,
    store: SessionStore,
    http: Client,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Creates a manager with no cached session. Nothing is read from disk yet.
    ///
    /// # Returns
    ///
    /// - `Ok(SessionManager)`: Ready to hand out sessions
    /// - `Err(ScraperError::Configuration)`: Invalid proxy, cookie key or HTTP client settings
    pub fn new(config: ScraperConfig, authenticator: Arc<dyn Authenticator>) -> Result<Self> {
        let store = SessionStore::from_config(&config)?;

        let mut builder = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(config.request_timeout());
        if let Some(proxy) = config.proxy.as_deref() {
            info!("Routing API requests through proxy {}", proxy);
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| {
                ScraperError::Configuration(format!("invalid proxy '{}': {}", proxy, e))
            })?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| ScraperError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(SessionManager {
            config,
            authenticator,
            store,
            http,
            state: Mutex::new(SessionState {
                current: None,
                generation: 0,
            }),
        })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// The transport shared by every request of this session.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Returns the current session, creating one if needed.
    ///
    /// Order of resolution: the cached session, then the persisted cookie file,
    /// then a fresh login through the [`Authenticator`] whose result is persisted.
    ///
    /// # Errors
    ///
    /// - `ScraperError::Configuration`: A login is needed but credentials are not configured
    /// - `ScraperError::Login`: The authenticator failed or returned no cookies
    /// - `ScraperError::Persistence`: The fresh session could not be written to disk
    pub async fn ensure_session(&self) -> Result<Arc<Session>> {
        let mut state = self.state.lock().await;
        if let Some(session) = &state.current {
            return Ok(Arc::clone(session));
        }

        let persisted = match self.store.load().await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!(
                    "Ignoring unreadable session file {}: {}",
                    self.store.path().display(),
                    e
                );
                None
            }
        };

        let cookies = match persisted {
            Some(cookies) => cookies,
            None => {
                let credentials = self.config.credentials()?;
                info!(
                    "No usable session found, logging in as {}",
                    credentials.username
                );
                let cookies = self.authenticator.login(&credentials).await?;
                if cookies.is_empty() {
                    return Err(ScraperError::Login(
                        "authenticator returned an empty cookie set".to_string(),
                    ));
                }
                info!("Login successful, {} cookies retrieved", cookies.len());
                self.store.save(&cookies).await?;
                cookies
            }
        };

        state.generation += 1;
        let session = Arc::new(Session::new(state.generation, cookies));
        debug!("Session generation {} is now active", session.generation());
        state.current = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Derives the request headers for `session`.
    ///
    /// The `x-csrf-token` header always equals the session's `ct0` cookie. When
    /// that cookie is missing the header is sent empty and a warning is logged;
    /// the API is then expected to reject the request.
    pub fn headers_for(&self, session: &Session) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(&build_bearer_auth_header(BEARER_TOKEN)) {
            headers.insert(AUTHORIZATION, value);
        }

        let csrf = match session.csrf_token() {
            Some(token) => {
                debug!("Using CSRF token (masked): {}", mask_secret(token));
                token
            }
            None => {
                warn!("CSRF token ({}) not found in cookies. Login might be invalid.", CSRF_COOKIE);
                ""
            }
        };
        let csrf_value = HeaderValue::from_str(csrf).unwrap_or_else(|_| {
            warn!("CSRF cookie contains characters not allowed in a header, sending it empty");
            HeaderValue::from_static("")
        });
        let auth_type = if csrf_value.is_empty() {
            ""
        } else {
            "OAuth2Session"
        };
        headers.insert(HeaderName::from_static("x-csrf-token"), csrf_value);
        headers.insert(
            HeaderName::from_static("x-twitter-auth-type"),
            HeaderValue::from_static(auth_type),
        );
        headers.insert(
            HeaderName::from_static("x-twitter-active-user"),
            HeaderValue::from_static("yes"),
        );
        headers.insert(
            HeaderName::from_static("x-twitter-client-language"),
            HeaderValue::from_static("en"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match HeaderValue::from_str(&session.cookie_header()) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => warn!("Session cookies cannot be encoded as a header, sending none"),
        }

        headers
    }

    /// Discards the cached and the persisted session.
    pub async fn invalidate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.current.take().is_some() {
            info!("Session generation {} invalidated", state.generation);
        }
        self.store.delete().await
    }

    /// Invalidates `session` only if it is still the active one.
    ///
    /// Returns `true` when this call discarded the session, `false` when another
    /// caller already replaced or discarded it.
    pub async fn invalidate_stale(&self, session: &Session) -> Result<bool> {
        let mut state = self.state.lock().await;
        let is_current = state
            .current
            .as_ref()
            .is_some_and(|current| current.generation() == session.generation());
        if !is_current {
            debug!(
                "Session generation {} already replaced, skipping invalidation",
                session.generation()
            );
            return Ok(false);
        }

        state.current = None;
        info!("Session generation {} invalidated", session.generation());
        self.store.delete().await?;
        Ok(true)
    }
}
