//! Durable storage for the session cookies.
//!
//! The session is persisted as a JSON array of cookie objects, optionally
//! encrypted with [`CookieCipher`]. It is read when no session is cached,
//! written after a fresh login and deleted on invalidation.

use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::ScraperConfig;
use crate::crypto::CookieCipher;
use crate::error::{Result, ScraperError};
use crate::session::SessionCookie;

/// Reads a plaintext JSON cookie array from `path`.
pub async fn read_cookie_file(path: &Path) -> Result<Vec<SessionCookie>> {
    let raw = tokio::fs::read(path).await?;
    let cookies: Vec<SessionCookie> = serde_json::from_slice(&raw)?;
    Ok(cookies)
}

#[derive(Clone)]
pub struct SessionStore {
    path: PathBuf,
    cipher: Option<CookieCipher>,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>, cipher: Option<CookieCipher>) -> Self {
        SessionStore {
            path: path.into(),
            cipher,
        }
    }

    /// Builds the store from the configured path and optional encryption key.
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let cipher = config
            .cookie_encryption_key
            .as_deref()
            .map(CookieCipher::from_hex_key)
            .transpose()?;
        if cipher.is_some() {
            info!("Session file encryption is enabled");
        }
        Ok(SessionStore::new(config.cookies_path.clone(), cipher))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted cookies.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(cookies))`: A non-empty cookie set was found
    /// - `Ok(None)`: No file, or the file holds an empty array
    /// - `Err(...)`: The file exists but cannot be read, decrypted or parsed
    pub async fn load(&self) -> Result<Option<Vec<SessionCookie>>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No session file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let json = match &self.cipher {
            Some(cipher) => {
                let text = String::from_utf8(raw).map_err(|e| {
                    ScraperError::Persistence(format!("session file is not text: {}", e))
                })?;
                if text.trim_start().starts_with('[') {
                    warn!(
                        "Session file {} is not encrypted, it will be encrypted on next save",
                        self.path.display()
                    );
                    text.into_bytes()
                } else {
                    cipher.decrypt(&text)?
                }
            }
            None => raw,
        };

        let cookies: Vec<SessionCookie> = serde_json::from_slice(&json)?;
        if cookies.is_empty() {
            debug!("Session file {} holds no cookies", self.path.display());
            return Ok(None);
        }

        info!(
            "Loaded {} cookies from {}",
            cookies.len(),
            self.path.display()
        );
        Ok(Some(cookies))
    }

    pub async fn save(&self, cookies: &[SessionCookie]) -> Result<()> {
        let json = serde_json::to_vec_pretty(cookies)?;
        let contents = match &self.cipher {
            Some(cipher) => cipher.encrypt(&json)?.into_bytes(),
            None => json,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, contents).await?;

        info!("Saved {} cookies to {}", cookies.len(), self.path.display());
        Ok(())
    }

    /// Removes the session file. A missing file is not an error.
    pub async fn delete(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Deleted session file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
