//! Usage: Client credential configuration (config.json schema + loader).

use crate::shared::error::{AppError, AppResult};
use serde::Deserialize;
use std::path::Path;

/// The application's Spotify client credentials, created once by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Reads the credentials file. A missing file is a user-facing condition,
/// not a bug: the error names the exact path and a template to create.
pub fn load(path: &Path) -> AppResult<AppConfig> {
    let raw = std::fs::read_to_string(path).map_err(|_| AppError::ConfigMissing {
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&raw).map_err(|source| AppError::ConfigInvalid {
        path: path.to_path_buf(),
        source,
    })
}
