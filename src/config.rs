//! Configuration module for the xharvest client.
//!
//! This module contains the configuration structure and the environment variable /
//! config file handling for the cookie-authenticated session.

use log::{debug, info, warn};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, ScraperError};

pub const DEFAULT_BASE_URL: &str = "https://x.com/i/api";
pub const DEFAULT_COOKIES_PATH: &str = "cookies.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_AUTH_RETRIES: u32 = 1;

/// Login credentials handed to the [`Authenticator`](crate::auth::Authenticator).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub two_factor_secret: Option<String>,
    pub proxy: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &mask_secret(&self.password))
            .field("email", &self.email)
            .field(
                "two_factor_secret",
                &self.two_factor_secret.as_deref().map(mask_secret),
            )
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Configuration for the session and the request executor.
///
/// Credentials are optional: a persisted cookie file is enough to make requests,
/// and credentials are only required when a fresh login has to happen.
#[derive(Clone, Deserialize)]
pub struct ScraperConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "2fa_secret", alias = "two_factor_secret")]
    pub two_factor_secret: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    /// Where the session cookies are persisted between runs
    #[serde(default = "default_cookies_path")]
    pub cookies_path: PathBuf,
    /// Optional 64-character hex key; when set the cookie file is stored encrypted
    #[serde(default)]
    pub cookie_encryption_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for a single HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Optional bound on a whole executor call, rate-limit waits and re-logins
    /// included. Unbounded when unset.
    #[serde(default)]
    pub call_timeout_secs: Option<u64>,
    #[serde(default = "default_max_auth_retries")]
    pub max_auth_retries: u32,
}

fn default_cookies_path() -> PathBuf {
    PathBuf::from(DEFAULT_COOKIES_PATH)
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_auth_retries() -> u32 {
    DEFAULT_MAX_AUTH_RETRIES
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            username: None,
            password: None,
            email: None,
            two_factor_secret: None,
            proxy: None,
            cookies_path: default_cookies_path(),
            cookie_encryption_key: None,
            base_url: default_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            call_timeout_secs: None,
            max_auth_retries: DEFAULT_MAX_AUTH_RETRIES,
        }
    }
}

impl fmt::Debug for ScraperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScraperConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_deref().map(mask_secret))
            .field("email", &self.email)
            .field(
                "two_factor_secret",
                &self.two_factor_secret.as_deref().map(mask_secret),
            )
            .field("proxy", &self.proxy)
            .field("cookies_path", &self.cookies_path)
            .field(
                "cookie_encryption_key",
                &self.cookie_encryption_key.as_deref().map(mask_secret),
            )
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("call_timeout_secs", &self.call_timeout_secs)
            .field("max_auth_retries", &self.max_auth_retries)
            .finish()
    }
}

impl ScraperConfig {
    /// Creates a new `ScraperConfig` by reading environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TWITTER_USERNAME`, `TWITTER_PASSWORD`: login credentials (only needed for a fresh login)
    /// - `TWITTER_EMAIL`: email used when the login flow asks for verification
    /// - `TWITTER_2FA_SECRET`: TOTP secret for two-factor login
    /// - `TWITTER_PROXY`: proxy URL used for login and API calls
    /// - `TWITTER_COOKIES_PATH`: persisted session file (defaults to `cookies.json`)
    /// - `TWITTER_COOKIE_KEY`: hex AES-256 key for encrypting the session file
    /// - `TWITTER_BASE_URL`: API base URL (defaults to `https://x.com/i/api`)
    /// - `TWITTER_REQUEST_TIMEOUT_SECS`: timeout of a single HTTP request (defaults to 30)
    /// - `TWITTER_CALL_TIMEOUT_SECS`: bound on a whole call, rate-limit waits included (unbounded by default)
    /// - `TWITTER_MAX_AUTH_RETRIES`: re-login budget per request (defaults to 1)
    ///
    /// # Returns
    ///
    /// - `Ok(ScraperConfig)`: If every variable that is present parses
    /// - `Err(ScraperError::Configuration)`: If a numeric variable or the base URL is invalid
    pub fn from_env() -> Result<Self> {
        info!("Loading scraper configuration from environment variables");

        let config = ScraperConfig {
            username: optional_env("TWITTER_USERNAME", false),
            password: optional_env("TWITTER_PASSWORD", true),
            email: optional_env("TWITTER_EMAIL", false),
            two_factor_secret: optional_env("TWITTER_2FA_SECRET", true),
            proxy: optional_env("TWITTER_PROXY", false),
            cookies_path: optional_env("TWITTER_COOKIES_PATH", false)
                .map(PathBuf::from)
                .unwrap_or_else(default_cookies_path),
            cookie_encryption_key: optional_env("TWITTER_COOKIE_KEY", true),
            base_url: optional_env("TWITTER_BASE_URL", false).unwrap_or_else(default_base_url),
            request_timeout_secs: parse_env(
                "TWITTER_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            call_timeout_secs: parse_optional_env("TWITTER_CALL_TIMEOUT_SECS")?,
            max_auth_retries: parse_env("TWITTER_MAX_AUTH_RETRIES", DEFAULT_MAX_AUTH_RETRIES)?,
        };

        config.validate()?;
        info!("Scraper configuration loaded successfully");
        Ok(config)
    }

    /// Loads the configuration from a JSON file.
    ///
    /// The file uses the same keys as the struct fields; the two-factor secret may
    /// be spelled `2fa_secret`. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading scraper configuration from {}", path.display());

        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScraperError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: ScraperConfig = serde_json::from_str(&raw).map_err(|e| {
            ScraperError::Configuration(format!("invalid config file {}: {}", path.display(), e))
        })?;

        config.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Checks the values that cannot be checked by deserialization alone.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url).map_err(|e| {
            ScraperError::Configuration(format!("invalid base URL '{}': {}", self.base_url, e))
        })?;

        if self.request_timeout_secs == 0 {
            return Err(ScraperError::Configuration(
                "request timeout must be at least one second".to_string(),
            ));
        }

        if self.call_timeout_secs == Some(0) {
            return Err(ScraperError::Configuration(
                "call timeout must be at least one second when set".to_string(),
            ));
        }

        if self.username.is_some() != self.password.is_some() {
            warn!("Only one of username/password is configured - fresh logins will fail");
        }

        Ok(())
    }

    /// Returns the login credentials, failing if username or password is missing.
    pub fn credentials(&self) -> Result<Credentials> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Credentials {
                    username: username.to_string(),
                    password: password.to_string(),
                    email: self.email.clone(),
                    two_factor_secret: self.two_factor_secret.clone(),
                    proxy: self.proxy.clone(),
                })
            }
            _ => Err(ScraperError::Configuration(
                "username and password are required to log in".to_string(),
            )),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }
}

/// Masks a secret for logging, keeping at most the first four characters.
pub(crate) fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if secret.chars().count() > 8 {
        format!("{}...", prefix)
    } else {
        "***".to_string()
    }
}

fn optional_env(name: &str, secret: bool) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => {
            if secret {
                info!("Found {} environment variable with length: {}", name, value.len());
                debug!("{} (masked): {}", name, mask_secret(&value));
            } else {
                info!("Found {} environment variable: {}", name, value);
            }
            Some(value)
        }
        Ok(_) => {
            warn!("{} is set but empty, ignoring it", name);
            None
        }
        Err(_) => {
            debug!("No {} found in environment variables", name);
            None
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    match optional_env(name, false) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            ScraperError::Configuration(format!("{} must be a number, got '{}': {}", name, raw, e))
        }),
        None => {
            debug!("{} not set, using default {}", name, default);
            Ok(default)
        }
    }
}

fn parse_optional_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    optional_env(name, false)
        .map(|raw| {
            raw.trim().parse().map_err(|e| {
                ScraperError::Configuration(format!(
                    "{} must be a number, got '{}': {}",
                    name, raw, e
                ))
            })
        })
        .transpose()
}
