//! Usage: Token endpoint POST helpers (authorization_code + refresh_token grants).

use crate::infra::config::AppConfig;
use crate::shared::error::AuthError;
use serde::Deserialize;
use serde_json::Value;

const ERROR_BODY_SNIPPET_LEN: usize = 300;

/// Successful token endpoint payload. `refresh_token` is optional because
/// a refresh response may omit it when the server chose not to rotate.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) refresh_token: Option<String>,
    #[serde(default)]
    pub(crate) expires_in: Option<i64>,
}

pub(crate) async fn exchange_authorization_code(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &AppConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse, AuthError> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
    ];
    post_grant(client, token_url, credentials, &form, |status, body| {
        AuthError::AuthorizationFailed { status, body }
    })
    .await
}

pub(crate) async fn refresh_access_token(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &AppConfig,
    refresh_token: &str,
) -> Result<TokenResponse, AuthError> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];
    post_grant(client, token_url, credentials, &form, |status, body| {
        AuthError::RefreshFailed { status, body }
    })
    .await
}

/// Both grants share the wire shape: form-encoded body, HTTP Basic client
/// authentication, JSON response. Status and body are read before parsing
/// so a rejection can carry the server's own description.
async fn post_grant(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &AppConfig,
    form: &[(&str, &str)],
    on_rejection: impl FnOnce(u16, String) -> AuthError,
) -> Result<TokenResponse, AuthError> {
    let response = client
        .post(token_url)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(form)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(on_rejection(status.as_u16(), describe_rejection(&body)));
    }

    serde_json::from_str(&body)
        .map_err(|err| AuthError::InvalidTokenResponse(err.to_string()))
}

/// Prefers the standard OAuth `error`/`error_description` fields; falls
/// back to a bounded raw snippet for non-JSON bodies.
fn describe_rejection(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let code = value
            .get("error")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let detail = value
            .get("error_description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty());
        match (code, detail) {
            (Some(code), Some(detail)) => return format!("{code}: {detail}"),
            (Some(code), None) => return code.to_string(),
            (None, Some(detail)) => return detail.to_string(),
            (None, None) => {}
        }
    }
    body.chars().take(ERROR_BODY_SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> AppConfig {
        AppConfig {
            client_id: "my-id".to_string(),
            client_secret: "my-secret".to_string(),
        }
    }

    fn basic_header() -> String {
        format!("Basic {}", STANDARD.encode("my-id:my-secret"))
    }

    #[tokio::test]
    async fn code_exchange_sends_basic_auth_and_form_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(header("authorization", basic_header()))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains(
                "redirect_uri=http%3A%2F%2F127.0.0.1%3A8888%2Fcallback",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let response = exchange_authorization_code(
            &client,
            &format!("{}/api/token", server.uri()),
            &credentials(),
            "the-code",
            "http://127.0.0.1:8888/callback",
        )
        .await
        .expect("exchange");

        assert_eq!(response.access_token, "new-access");
        assert_eq!(response.refresh_token.as_deref(), Some("new-refresh"));
        assert_eq!(response.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn refresh_grant_may_omit_the_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresher-access",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let response = refresh_access_token(
            &client,
            &format!("{}/api/token", server.uri()),
            &credentials(),
            "old-refresh",
        )
        .await
        .expect("refresh");

        assert_eq!(response.access_token, "fresher-access");
        assert_eq!(response.refresh_token, None);
    }

    #[tokio::test]
    async fn rejected_code_surfaces_the_server_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code"
            })))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = exchange_authorization_code(
            &client,
            &format!("{}/api/token", server.uri()),
            &credentials(),
            "bad-code",
            "http://127.0.0.1:8888/callback",
        )
        .await
        .expect_err("should fail");

        let AuthError::AuthorizationFailed { status, body } = err else {
            panic!("expected AuthorizationFailed, got {err:?}");
        };
        assert_eq!(status, 400);
        assert_eq!(body, "invalid_grant: Invalid authorization code");
    }

    #[tokio::test]
    async fn rejected_refresh_maps_to_refresh_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = refresh_access_token(
            &client,
            &format!("{}/api/token", server.uri()),
            &credentials(),
            "revoked",
        )
        .await
        .expect_err("should fail");

        assert!(matches!(
            err,
            AuthError::RefreshFailed { status: 401, ref body } if body == "nope"
        ));
    }

    #[test]
    fn describe_rejection_handles_partial_and_raw_bodies() {
        assert_eq!(describe_rejection(r#"{"error": "server_error"}"#), "server_error");
        assert_eq!(
            describe_rejection(r#"{"error_description": "boom"}"#),
            "boom"
        );
        assert_eq!(describe_rejection("plain text failure"), "plain text failure");
    }
}
