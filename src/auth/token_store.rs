//! Usage: Durable persistence for the single Spotify credential record.

use crate::shared::error::StoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Refresh this many seconds before the declared expiry so an access token
/// cannot lapse mid-request.
pub(crate) const EXPIRY_SAFETY_MARGIN_SECS: i64 = 60;

/// Spotify declares 3600 today; stored records predating the field fall
/// back to the same window.
pub(crate) const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN_SECS
}

/// The persisted unit of authentication state. Written whole on every
/// issuance or refresh, never merged. `issued_at` is captured from the
/// local clock; the server never supplies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    pub issued_at: i64,
}

impl CredentialRecord {
    /// True once the token is inside the safety margin of its expiry and
    /// must be refreshed before use.
    pub fn is_stale(&self, now_unix: i64) -> bool {
        let age = now_unix.saturating_sub(self.issued_at);
        age > self.expires_in - EXPIRY_SAFETY_MARGIN_SECS
    }
}

/// One JSON file at a fixed per-application path. Reads fail soft (any
/// problem reads as "never authenticated"), writes fail hard.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, unreadable, and malformed files all read as absent; a bad
    /// token file self-heals through re-authorization, never a crash.
    pub fn load(&self) -> Option<CredentialRecord> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), "no token file: {err}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "token file is not a valid credential record, re-authorizing: {err}"
                );
                None
            }
        }
    }

    /// Creates parent directories as needed and replaces any prior content.
    /// The record goes to a sibling temp file first and is renamed into
    /// place, so a crash mid-write cannot leave a truncated record behind.
    pub fn save(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        self.write_atomically(record)
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }

    fn write_atomically(&self, record: &CredentialRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(record).map_err(std::io::Error::other)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)
    }
}
