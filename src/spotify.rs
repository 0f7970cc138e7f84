//! Usage: Thin Spotify Web API client for the like-current-track flow.
//!
//! Three calls, each attempted once: currently-playing, library contains,
//! library save. Failures are reported, never retried.

use crate::shared::error::ApiError;
use serde::Deserialize;

const ERROR_BODY_SNIPPET_LEN: usize = 300;

pub struct SpotifyClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayingTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlayingResponse {
    #[serde(default)]
    item: Option<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    // Local files carry no catalog id.
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

impl SpotifyClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    /// `None` when playback is idle (204), when the playing item is not a
    /// track, or when the track has no catalog id to like.
    pub async fn currently_playing(&self) -> Result<Option<PlayingTrack>, ApiError> {
        let response = self
            .http
            .get(format!("{}/v1/me/player/currently-playing", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let playing: CurrentlyPlayingResponse =
            serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(playing.item.and_then(|item| {
            let id = item.id?;
            Some(PlayingTrack {
                id,
                name: item.name,
                artists: item.artists.into_iter().map(|a| a.name).collect(),
            })
        }))
    }

    /// Checks the user's library. The endpoint answers with booleans
    /// aligned to the requested id list; one id in, one flag out.
    pub async fn is_saved(&self, track_id: &str) -> Result<bool, ApiError> {
        let response = self
            .http
            .get(format!("{}/v1/me/tracks/contains", self.base_url))
            .query(&[("ids", track_id)])
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let flags: Vec<bool> =
            serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
        flags
            .first()
            .copied()
            .ok_or_else(|| ApiError::Decode("contains response held no entries".to_string()))
    }

    /// Saves the track to the library. Idempotent on the server side.
    pub async fn save_track(&self, track_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .put(format!("{}/v1/me/tracks", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "ids": [track_id] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }
        Ok(())
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(ERROR_BODY_SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SpotifyClient {
        SpotifyClient::new(reqwest::Client::new(), server.uri(), "the-token")
    }

    #[tokio::test]
    async fn idle_playback_reads_as_nothing_playing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .and(header("authorization", "Bearer the-token"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert_eq!(client(&server).currently_playing().await.expect("call"), None);
    }

    #[tokio::test]
    async fn playing_track_is_decoded_with_artists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "item": {
                    "id": "track-1",
                    "name": "Song",
                    "artists": [{"name": "Alpha"}, {"name": "Beta"}]
                }
            })))
            .mount(&server)
            .await;

        let track = client(&server)
            .currently_playing()
            .await
            .expect("call")
            .expect("track");
        assert_eq!(track.id, "track-1");
        assert_eq!(track.name, "Song");
        assert_eq!(track.artists, vec!["Alpha".to_string(), "Beta".to_string()]);
    }

    #[tokio::test]
    async fn null_item_and_missing_id_read_as_nothing_playing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"item": null})))
            .expect(1)
            .mount(&server)
            .await;
        assert_eq!(client(&server).currently_playing().await.expect("call"), None);

        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "item": {"id": null, "name": "Local File", "artists": []}
            })))
            .mount(&server)
            .await;
        assert_eq!(client(&server).currently_playing().await.expect("call"), None);
    }

    #[tokio::test]
    async fn contains_flag_is_positional() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/tracks/contains"))
            .and(query_param("ids", "track-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([true])))
            .mount(&server)
            .await;

        assert!(client(&server).is_saved("track-1").await.expect("call"));
    }

    #[tokio::test]
    async fn save_puts_the_id_list() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/tracks"))
            .and(body_json(json!({"ids": ["track-1"]})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).save_track("track-1").await.expect("save");
    }

    #[tokio::test]
    async fn api_rejection_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired token"))
            .mount(&server)
            .await;

        let err = client(&server)
            .currently_playing()
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            ApiError::Status { status: 401, ref body } if body == "expired token"
        ));
    }
}
