//! Usage: Error taxonomy for the crate (one thiserror enum per failure domain).

use std::path::PathBuf;

pub type AppResult<T> = Result<T, AppError>;

/// Failures of the local redirect listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind oauth callback listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out waiting for the oauth callback; the browser login was not completed")]
    Timeout,
    #[error("oauth callback carried no authorization code")]
    MissingCode,
    #[error("oauth callback state did not match this authorization attempt")]
    StateMismatch,
    #[error("authorization was denied: {error}")]
    Denied {
        error: String,
        description: Option<String>,
    },
    #[error("oauth callback i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Persisting credentials failed. Unlike reads, this is fatal: tokens that
/// cannot be written back would force a browser login on every run.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write token file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("token endpoint unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid authorize endpoint {url}: {message}")]
    Endpoint { url: String, message: String },
    #[error("token endpoint returned an unusable response: {0}")]
    InvalidTokenResponse(String),
    #[error("authorization failed, token endpoint returned status {status}: {body}")]
    AuthorizationFailed { status: u16, body: String },
    #[error(
        "stored credentials were rejected (status {status}): {body}; \
         delete the token file and run again to sign in from scratch"
    )]
    RefreshFailed { status: u16, body: String },
}

/// Downstream Spotify Web API failures. Reported once, never retried.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("spotify api unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("spotify api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected spotify api response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(
        "No configuration file found.\nCreate a config.json file at: {}\nWith content like: \
         {{\"client_id\": \"your_id\", \"client_secret\": \"your_secret\"}}",
        .path.display()
    )]
    ConfigMissing { path: PathBuf },
    #[error("configuration file {} is not usable: {source}", .path.display())]
    ConfigInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not determine the user's {kind} directory on this platform")]
    MissingUserDir { kind: &'static str },
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_missing_names_path_and_template() {
        let err = AppError::ConfigMissing {
            path: PathBuf::from("/home/u/.config/lazyfav/config.json"),
        };
        let message = err.to_string();
        assert!(message.contains("/home/u/.config/lazyfav/config.json"));
        assert!(message.contains("client_id"));
        assert!(message.contains("client_secret"));
    }

    #[test]
    fn refresh_failure_tells_the_user_how_to_recover() {
        let err = AuthError::RefreshFailed {
            status: 400,
            body: "invalid_grant".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("invalid_grant"));
        assert!(message.contains("sign in from scratch"));
    }
}
