//! Usage: Resolve the per-application config and token file locations.

use crate::shared::error::{AppError, AppResult};
use std::path::PathBuf;

const APP_DIR_NAME: &str = "lazyfav";
const CONFIG_FILE_NAME: &str = "config.json";
const TOKEN_FILE_NAME: &str = "spotify_tokens.json";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_file: PathBuf,
    pub token_file: PathBuf,
}

impl AppPaths {
    /// Platform convention: `<config dir>/lazyfav/config.json` for the
    /// client credentials, `<data dir>/lazyfav/spotify_tokens.json` for
    /// the persisted token record.
    pub fn resolve() -> AppResult<Self> {
        let config_root = dirs::config_dir().ok_or(AppError::MissingUserDir { kind: "config" })?;
        let data_root = dirs::data_dir().ok_or(AppError::MissingUserDir { kind: "data" })?;
        Ok(Self {
            config_file: config_root.join(APP_DIR_NAME).join(CONFIG_FILE_NAME),
            token_file: data_root.join(APP_DIR_NAME).join(TOKEN_FILE_NAME),
        })
    }

    /// Both files under one root. Used by tests and portable setups.
    pub fn under_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_file: root.join(CONFIG_FILE_NAME),
            token_file: root.join(TOKEN_FILE_NAME),
        }
    }
}
