//! Like the currently playing Spotify track from the terminal.
//!
//! One run does one thing: make sure whatever is playing right now is in
//! the user's Liked Songs. Credentials come from the OAuth2
//! authorization-code flow and are kept fresh across invocations by
//! [`auth::AuthManager`].

pub mod auth;
pub mod infra;
pub mod shared;
pub mod spotify;

use crate::auth::token_store::TokenStore;
use crate::auth::AuthManager;
use crate::infra::app_paths::AppPaths;
use crate::infra::config;
use crate::shared::error::{AppError, AppResult};
use crate::spotify::SpotifyClient;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The port Spotify app registrations use for the loopback redirect.
pub const DEFAULT_CALLBACK_PORT: u16 = 8888;

/// Where the authorization server and the resource API live. Injectable so
/// tests can point every call at a local mock.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub callback_port: u16,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base_url: "https://api.spotify.com".to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    NothingPlaying,
    AlreadyLiked,
    Liked,
}

/// The whole check-then-act sequence: valid token, what is playing, is it
/// liked, like it if not. Each downstream call is attempted exactly once.
pub async fn run(
    paths: &AppPaths,
    endpoints: &Endpoints,
    callback_timeout: Option<Duration>,
) -> AppResult<RunOutcome> {
    let config = config::load(&paths.config_file)?;
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(AppError::HttpClient)?;

    let store = TokenStore::new(&paths.token_file);
    let manager = AuthManager::new(http.clone(), config, endpoints, store, callback_timeout);
    let access_token = manager.obtain_valid_token().await?;

    let client = SpotifyClient::new(http, endpoints.api_base_url.clone(), access_token);
    let Some(track) = client.currently_playing().await? else {
        println!("No track currently playing.");
        return Ok(RunOutcome::NothingPlaying);
    };
    println!("Now playing: {} by {}", track.name, track.artists.join(", "));

    if client.is_saved(&track.id).await? {
        println!("Playing track is already liked!");
        return Ok(RunOutcome::AlreadyLiked);
    }
    client.save_track(&track.id).await?;
    println!("Track liked!");
    Ok(RunOutcome::Liked)
}
