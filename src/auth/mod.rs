//! Usage: Credential lifecycle manager for the Spotify authorization-code flow.
//!
//! `AuthManager::obtain_valid_token` is the single entry point: it loads the
//! cached record, refreshes it inside the expiry safety margin, or drives a
//! full browser authorization when nothing usable is stored.

pub(crate) mod callback_server;
pub(crate) mod token_exchange;
pub mod token_store;

use crate::infra::config::AppConfig;
use crate::shared::error::AuthError;
use crate::shared::security::mask_token;
use crate::shared::time::now_unix_seconds;
use crate::Endpoints;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use reqwest::Url;
use std::time::Duration;
use token_store::{CredentialRecord, TokenStore, DEFAULT_EXPIRES_IN_SECS};

/// Scopes for reading playback state and reading/modifying the library.
pub(crate) const SCOPES: &[&str] = &[
    "playlist-read-private",
    "user-read-playback-state",
    "user-read-currently-playing",
    "user-library-read",
    "user-library-modify",
];

const STATE_NONCE_BYTES: usize = 32;

pub struct AuthManager {
    http: reqwest::Client,
    config: AppConfig,
    authorize_url: String,
    token_url: String,
    callback_port: u16,
    store: TokenStore,
    callback_timeout: Option<Duration>,
}

impl AuthManager {
    /// Client credentials are threaded in explicitly; nothing here reads
    /// ambient process state.
    pub fn new(
        http: reqwest::Client,
        config: AppConfig,
        endpoints: &Endpoints,
        store: TokenStore,
        callback_timeout: Option<Duration>,
    ) -> Self {
        Self {
            http,
            config,
            authorize_url: endpoints.authorize_url.clone(),
            token_url: endpoints.token_url.clone(),
            callback_port: endpoints.callback_port,
            store,
            callback_timeout,
        }
    }

    /// Returns an access token that is good for at least the safety margin.
    /// A fresh cached token is returned as-is, without any network call.
    pub async fn obtain_valid_token(&self) -> Result<String, AuthError> {
        match self.store.load() {
            None => {
                println!("No stored credentials. Opening browser to log in...");
                self.authorize().await
            }
            Some(record) if record.is_stale(now_unix_seconds()) => {
                println!("Access token expired. Refreshing...");
                self.refresh(record).await
            }
            Some(record) => {
                tracing::debug!(
                    "using cached access token {}",
                    mask_token(&record.access_token)
                );
                Ok(record.access_token)
            }
        }
    }

    /// Full authorization-code exchange. The listener is bound before the
    /// browser opens so the redirect cannot be lost.
    async fn authorize(&self) -> Result<String, AuthError> {
        let listener = callback_server::bind(self.callback_port).await?;
        tracing::debug!("callback listener bound on port {}", listener.port());
        let redirect_uri = listener.redirect_uri();
        let state = generate_state_nonce();
        let authorize_url = self.build_authorize_url(&redirect_uri, &state)?;

        if webbrowser::open(authorize_url.as_str()).is_err() {
            tracing::warn!("could not open a browser automatically");
            println!("Open this URL in your browser to continue:\n{authorize_url}");
        }

        let code = listener
            .await_redirect(&state, self.callback_timeout)
            .await?;
        tracing::debug!("authorization code received, exchanging for tokens");

        let response = token_exchange::exchange_authorization_code(
            &self.http,
            &self.token_url,
            &self.config,
            &code,
            &redirect_uri,
        )
        .await?;
        let refresh_token = response.refresh_token.ok_or_else(|| {
            AuthError::InvalidTokenResponse("code exchange response omitted refresh_token".into())
        })?;

        let record = CredentialRecord {
            access_token: response.access_token,
            refresh_token,
            expires_in: response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            issued_at: now_unix_seconds(),
        };
        self.store.save(&record)?;
        tracing::info!(
            "authorization complete, tokens stored at {}",
            self.store.path().display()
        );
        Ok(record.access_token)
    }

    /// Refresh-token exchange. The server may decline to rotate the refresh
    /// token; the prior one is carried into the new record in that case.
    async fn refresh(&self, prior: CredentialRecord) -> Result<String, AuthError> {
        let response = token_exchange::refresh_access_token(
            &self.http,
            &self.token_url,
            &self.config,
            &prior.refresh_token,
        )
        .await?;

        let record = CredentialRecord {
            access_token: response.access_token,
            refresh_token: response.refresh_token.unwrap_or(prior.refresh_token),
            expires_in: response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            issued_at: now_unix_seconds(),
        };
        self.store.save(&record)?;
        tracing::debug!(
            "token refreshed, now holding {}",
            mask_token(&record.access_token)
        );
        Ok(record.access_token)
    }

    fn build_authorize_url(&self, redirect_uri: &str, state: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.authorize_url).map_err(|err| AuthError::Endpoint {
            url: self.authorize_url.clone(),
            message: err.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("state", state);
        Ok(url)
    }
}

fn generate_state_nonce() -> String {
    let mut random = [0u8; STATE_NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut random);
    URL_SAFE_NO_PAD.encode(random)
}
