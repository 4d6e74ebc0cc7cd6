//! Core request utilities for the web GraphQL API.
//!
//! This module contains the resilient request executor: every call goes through
//! the session manager for credentials and is retried according to how the API
//! signalled failure (rate-limit headers, 401/403, or an empty-user body on a 2xx).

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, ScraperError};
use crate::session::{Session, SessionManager};

pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-rate-limit-remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

/// Below this many remaining calls the executor waits for the window to reset.
const RATE_LIMIT_THRESHOLD: i64 = 2;
/// Added to the computed wait so the retry lands after the reset.
const RATE_LIMIT_MARGIN: Duration = Duration::from_secs(1);
/// Longest body excerpt carried in errors and logs.
const BODY_SNIPPET_LEN: usize = 500;

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_len`: Maximum length in characters before truncation
///
/// # Returns
///
/// A sanitized string safe for logging
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    // Replace control characters and newlines to prevent log injection
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' => ' ',
            '\r' => ' ',
            '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// How long to wait before retrying, if the rate-limit headers ask for it.
///
/// A wait is due when `x-rate-limit-remaining` is below 2 and
/// `x-rate-limit-reset` (epoch seconds) lies in the future. The wait lasts
/// until the reset plus a one second margin.
pub fn rate_limit_delay(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let remaining: i64 = header_number(headers, RATE_LIMIT_REMAINING_HEADER)?;
    if remaining >= RATE_LIMIT_THRESHOLD {
        return None;
    }

    let reset_epoch: i64 = header_number(headers, RATE_LIMIT_RESET_HEADER)?;
    let reset = DateTime::<Utc>::from_timestamp(reset_epoch, 0)?;
    let until_reset = (reset - now).to_std().ok()?;
    if until_reset.is_zero() {
        return None;
    }
    Some(until_reset + RATE_LIMIT_MARGIN)
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// True for the `{"data": {"user": {}}}` body the API returns with a 2xx
/// status when it silently rejects the session.
pub fn is_soft_auth_failure(body: &Value) -> bool {
    *body == json!({ "data": { "user": {} } })
}

/// Executes API requests on behalf of a [`SessionManager`].
#[derive(Clone)]
pub struct RequestExecutor {
    sessions: Arc<SessionManager>,
}

enum Attempt {
    Done(Value),
    RateLimited(Duration),
    AuthRejected { status: u16, body: String },
}

impl RequestExecutor {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        RequestExecutor { sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Executes a request with rate-limit waits and bounded re-authentication.
    ///
    /// The call is only bounded as a whole when `call_timeout_secs` is
    /// configured; otherwise a rate-limit wait lasts until the window resets.
    /// Each HTTP request is still bounded by `request_timeout_secs`.
    ///
    /// Per attempt:
    /// 1. Ensure a session and derive its headers, then send the request.
    /// 2. If the rate-limit headers ask for a wait, sleep until the reset and
    ///    repeat the attempt without consuming a retry.
    /// 3. On 401/403, or a 2xx whose body is the empty-user sentinel, invalidate
    ///    the session and retry with a fresh login while `retries_remaining > 0`.
    /// 4. Any other error status is returned immediately.
    ///
    /// # Errors
    ///
    /// - `ScraperError::AuthExhausted`: Authentication kept failing after all retries
    /// - `ScraperError::Http`: Any other non-success status
    /// - `ScraperError::Transport` / `ScraperError::Timeout`: Network failure or timeout
    /// - Errors from [`SessionManager::ensure_session`]
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        retries_remaining: u32,
    ) -> Result<Value> {
        match self.sessions.config().call_timeout() {
            Some(timeout) => {
                self.execute_with_timeout(method, url, params, retries_remaining, timeout)
                    .await
            }
            None => self.run(method, url, params, retries_remaining).await,
        }
    }

    /// Like [`RequestExecutor::execute`], with `timeout` bounding the whole
    /// call, sleeps and re-logins included.
    pub async fn execute_with_timeout(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        retries_remaining: u32,
        timeout: Duration,
    ) -> Result<Value> {
        match tokio::time::timeout(timeout, self.run(method, url, params, retries_remaining)).await
        {
            Ok(result) => result,
            Err(_) => {
                error!("Request to {} timed out after {:?}", url, timeout);
                Err(ScraperError::Timeout(timeout))
            }
        }
    }

    async fn run(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        retries_remaining: u32,
    ) -> Result<Value> {
        let mut retries = retries_remaining;
        loop {
            let session = self.sessions.ensure_session().await?;
            match self.attempt(&session, method.clone(), url, params).await? {
                Attempt::Done(body) => return Ok(body),
                Attempt::RateLimited(delay) => {
                    warn!(
                        "Rate limit almost exhausted for {}, waiting {:?} for the window to reset",
                        url, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Attempt::AuthRejected { status, body } => {
                    if retries == 0 {
                        error!(
                            "Authentication still rejected for {} (status {}) and no retries left",
                            url, status
                        );
                        return Err(ScraperError::AuthExhausted { status, body });
                    }
                    retries -= 1;
                    warn!(
                        "Session rejected for {} (status {}), re-authenticating ({} retries left after this one)",
                        url, status, retries
                    );
                    self.sessions.invalidate_stale(&session).await?;
                }
            }
        }
    }

    async fn attempt(
        &self,
        session: &Session,
        method: Method,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Attempt> {
        debug!("{} {} with {} parameters", method, url, params.len());

        let response = self
            .sessions
            .http()
            .request(method, url)
            .headers(self.sessions.headers_for(session))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        info!("Received response with status: {} for {}", status, url);

        if let Some(delay) = rate_limit_delay(response.headers(), Utc::now()) {
            return Ok(Attempt::RateLimited(delay));
        }

        let text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(
                "Auth failure body for {}: {}",
                url,
                sanitize_for_logging(&text, 200)
            );
            return Ok(Attempt::AuthRejected {
                status: status.as_u16(),
                body: sanitize_for_logging(&text, BODY_SNIPPET_LEN),
            });
        }

        if !status.is_success() {
            error!("Request to {} failed - Status: {}", url, status);
            return Err(ScraperError::Http {
                status: status.as_u16(),
                body: sanitize_for_logging(&text, BODY_SNIPPET_LEN),
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            ScraperError::Parse(format!(
                "response from {} is not JSON ({}): {}",
                url,
                e,
                sanitize_for_logging(&text, 200)
            ))
        })?;

        if is_soft_auth_failure(&body) {
            warn!("Received empty user object from {} - session silently rejected", url);
            return Ok(Attempt::AuthRejected {
                status: status.as_u16(),
                body: sanitize_for_logging(&text, BODY_SNIPPET_LEN),
            });
        }

        debug!("Response summary for {}: {} bytes received", url, text.len());
        Ok(Attempt::Done(body))
    }
}
