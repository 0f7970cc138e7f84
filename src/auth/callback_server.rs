//! Usage: One-shot localhost listener that captures the authorization redirect.

use crate::shared::error::ListenerError;
use crate::shared::security::constant_time_eq;
use reqwest::Url;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const CALLBACK_PATH: &str = "/callback";
const SUCCESS_HTML: &str =
    "<html><body><h1>Spotify auth complete.</h1><p>You can close this window.</p></body></html>";
const DENIED_HTML: &str =
    "<html><body><h1>Authorization was not granted.</h1><p>You can close this window.</p></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CallbackRequest {
    /// Anything that is not the callback route (favicon probes and the
    /// like). The listener stays silent and keeps waiting.
    Unrelated,
    Callback {
        code: Option<String>,
        state: Option<String>,
        error: Option<String>,
        error_description: Option<String>,
    },
}

/// A bound-but-not-yet-serving callback socket. Binding is split from
/// waiting so the caller can open the browser only after the port is held.
#[derive(Debug)]
pub(crate) struct BoundCallbackListener {
    listener: TcpListener,
    port: u16,
}

pub(crate) async fn bind(port: u16) -> Result<BoundCallbackListener, ListenerError> {
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(addr.as_str())
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;
    let port = listener.local_addr().map_err(ListenerError::Io)?.port();
    Ok(BoundCallbackListener { listener, port })
}

impl BoundCallbackListener {
    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, CALLBACK_PATH)
    }

    /// Serves at most one callback, then resolves with the authorization
    /// code. Consumes the listener: the port is released on every exit
    /// path, success or failure.
    pub(crate) async fn await_redirect(
        self,
        expected_state: &str,
        timeout: Option<Duration>,
    ) -> Result<String, ListenerError> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.accept_loop(expected_state))
                .await
                .map_err(|_| ListenerError::Timeout)?,
            None => self.accept_loop(expected_state).await,
        }
    }

    async fn accept_loop(&self, expected_state: &str) -> Result<String, ListenerError> {
        loop {
            let (mut socket, peer) = self.listener.accept().await?;
            let Some(request) = read_request(&mut socket).await else {
                tracing::debug!(%peer, "discarding unreadable callback connection");
                continue;
            };
            let Some(target) = extract_request_target(&request) else {
                continue;
            };

            match parse_callback_target(&target) {
                CallbackRequest::Unrelated => continue,
                CallbackRequest::Callback {
                    error: Some(error),
                    error_description,
                    ..
                } => {
                    respond(&mut socket, "400 Bad Request", "text/html", DENIED_HTML).await;
                    return Err(ListenerError::Denied {
                        error,
                        description: error_description,
                    });
                }
                CallbackRequest::Callback { code: None, .. } => {
                    respond(&mut socket, "400 Bad Request", "text/plain", "No code received.")
                        .await;
                    return Err(ListenerError::MissingCode);
                }
                CallbackRequest::Callback {
                    code: Some(code),
                    state,
                    ..
                } => {
                    let state_matches = state
                        .as_deref()
                        .is_some_and(|s| constant_time_eq(s.as_bytes(), expected_state.as_bytes()));
                    if !state_matches {
                        respond(&mut socket, "400 Bad Request", "text/plain", "State mismatch.")
                            .await;
                        return Err(ListenerError::StateMismatch);
                    }
                    respond(&mut socket, "200 OK", "text/html", SUCCESS_HTML).await;
                    return Ok(code);
                }
            }
        }
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buffer = vec![0u8; 8192];
    let size = socket.read(&mut buffer).await.ok()?;
    if size == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&buffer[..size]).into_owned())
}

fn extract_request_target(request: &str) -> Option<String> {
    let first = request.lines().next()?;
    let mut parts = first.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    if method != "GET" || target.is_empty() {
        return None;
    }
    Some(target.to_string())
}

pub(crate) fn parse_callback_target(target: &str) -> CallbackRequest {
    let Ok(url) = Url::parse(&format!("http://127.0.0.1{target}")) else {
        return CallbackRequest::Unrelated;
    };
    if url.path() != CALLBACK_PATH {
        return CallbackRequest::Unrelated;
    }

    let mut code: Option<String> = None;
    let mut state: Option<String> = None;
    let mut error: Option<String> = None;
    let mut error_description: Option<String> = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    CallbackRequest::Callback {
        code,
        state,
        error,
        error_description,
    }
}

async fn respond(socket: &mut TcpStream, status: &str, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
