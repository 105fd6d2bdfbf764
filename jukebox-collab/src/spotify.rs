use async_trait::async_trait;
use rand::{seq::SliceRandom, Rng};
use reqwest::{header::CONTENT_LENGTH, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use crate::{
    Config, PickError, PlaybackControl, PlaybackError, Profile, ProfileError, ProfileLookup,
    TrackData, TrackPicker,
};

const TRACK_URI_PREFIX: &str = "spotify:track:";

/// Talks to the Spotify Web API on behalf of participants
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    id: String,
    display_name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Playlist {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    uri: String,
    name: String,
    artists: Vec<Artist>,
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

impl Track {
    /// Local files and podcast episodes also show up in playlists, but cannot be played by uri
    fn is_playable(&self) -> bool {
        self.uri.starts_with(TRACK_URI_PREFIX)
    }
}

impl From<CurrentUser> for Profile {
    fn from(user: CurrentUser) -> Self {
        Self {
            external_id: user.id,
            display_name: user.display_name,
            email: user.email,
        }
    }
}

impl From<Track> for TrackData {
    fn from(track: Track) -> Self {
        let artists = track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let image_url = track
            .album
            .and_then(|a| a.images.into_iter().next())
            .map(|i| i.url);

        Self {
            uri: track.uri,
            name: track.name,
            artists,
            image_url,
        }
    }
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            base_url: config.spotify_api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T>(&self, token: &str, path: &str, failure: &str) -> Result<T, String>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| format!("spotify_unreachable: {}", e))?;

        let response = check(response, failure).await?;

        response
            .json()
            .await
            .map_err(|e| format!("spotify_invalid_response: {}", e))
    }

    async fn put_player(&self, request: RequestBuilder, failure: &str) -> Result<(), PlaybackError> {
        let response = request
            .send()
            .await
            .map_err(|e| PlaybackError::new(format!("{} (unreachable): {}", failure, e)))?;

        check(response, failure)
            .await
            .map(|_| ())
            .map_err(PlaybackError::new)
    }

    fn player(&self, token: &str, action: &str, device_id: &str) -> RequestBuilder {
        self.http
            .put(format!("{}/me/player/{}", self.base_url, action))
            .query(&[("device_id", device_id)])
            .bearer_auth(token)
    }
}

#[async_trait]
impl TrackPicker for SpotifyClient {
    async fn pick_track(&self, token: &str) -> Result<TrackData, PickError> {
        let playlists: Page<Playlist> = self
            .get(token, "/me/playlists?limit=50", "spotify_error")
            .await
            .map_err(PickError::new)?;

        let playlist = playlists
            .items
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| PickError::new("no_playlists"))?;

        let path = format!("/playlists/{}/tracks?limit=100", playlist.id);
        let items: Page<PlaylistItem> = self
            .get(token, &path, "spotify_error")
            .await
            .map_err(PickError::new)?;

        random_playable(items.items).ok_or_else(|| PickError::new("no_tracks"))
    }
}

#[async_trait]
impl ProfileLookup for SpotifyClient {
    async fn current_profile(&self, token: &str) -> Result<Profile, ProfileError> {
        let user: CurrentUser = self
            .get(token, "/me", "profile_failed")
            .await
            .map_err(ProfileError::new)?;

        Ok(user.into())
    }
}

#[async_trait]
impl PlaybackControl for SpotifyClient {
    async fn play(
        &self,
        token: &str,
        device_id: &str,
        track_uri: &str,
    ) -> Result<(), PlaybackError> {
        let request = self
            .player(token, "play", device_id)
            .json(&json!({ "uris": [track_uri], "position_ms": 0 }));

        self.put_player(request, "playback_failed").await
    }

    async fn pause(&self, token: &str, device_id: &str) -> Result<(), PlaybackError> {
        let request = self
            .player(token, "pause", device_id)
            .header(CONTENT_LENGTH, 0);

        self.put_player(request, "pause_failed").await
    }

    async fn resume(&self, token: &str, device_id: &str) -> Result<(), PlaybackError> {
        let request = self
            .player(token, "play", device_id)
            .header(CONTENT_LENGTH, 0);

        self.put_player(request, "resume_failed").await
    }
}

fn random_playable(items: Vec<PlaylistItem>) -> Option<TrackData> {
    let mut playable: Vec<_> = items
        .into_iter()
        .filter_map(|i| i.track)
        .filter(Track::is_playable)
        .collect();

    if playable.is_empty() {
        return None;
    }

    let index = rand::thread_rng().gen_range(0..playable.len());
    Some(playable.swap_remove(index).into())
}

/// Turns an unsuccessful response into a reason like `playback_failed (404): ...`
async fn check(response: Response, failure: &str) -> Result<Response, String> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(format!("{} ({}): {}", failure, status.as_u16(), body))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::Profile;

    use super::{random_playable, CurrentUser, Page, PlaylistItem};

    fn items(value: serde_json::Value) -> Vec<PlaylistItem> {
        serde_json::from_value::<Page<PlaylistItem>>(value)
            .unwrap()
            .items
    }

    #[test]
    fn picks_only_playable_tracks() {
        let items = items(json!({
            "items": [
                { "track": null },
                {
                    "track": {
                        "uri": "spotify:local:artist:album:song:120",
                        "name": "Local file",
                        "artists": [],
                        "album": null
                    }
                },
                {
                    "track": {
                        "uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
                        "name": "Never Gonna Give You Up",
                        "artists": [{ "name": "Rick Astley" }, { "name": "Someone Else" }],
                        "album": {
                            "images": [
                                { "url": "https://i.scdn.co/image/large" },
                                { "url": "https://i.scdn.co/image/small" }
                            ]
                        }
                    }
                }
            ]
        }));

        let track = random_playable(items).unwrap();

        assert_eq!(track.uri, "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.artists, "Rick Astley, Someone Else");
        assert_eq!(
            track.image_url.as_deref(),
            Some("https://i.scdn.co/image/large")
        );
    }

    #[test]
    fn profile_from_current_user() {
        let user: CurrentUser = serde_json::from_value(json!({
            "id": "wizzler",
            "display_name": "JM Wizzler",
            "email": null,
            "country": "SE",
            "followers": { "total": 3 }
        }))
        .unwrap();

        assert_eq!(
            Profile::from(user),
            Profile {
                external_id: "wizzler".to_string(),
                display_name: Some("JM Wizzler".to_string()),
                email: None,
            }
        );
    }

    #[test]
    fn no_playable_tracks() {
        let items = items(json!({ "items": [{ "track": null }] }));

        assert!(random_playable(items).is_none());
        assert!(random_playable(vec![]).is_none());
    }
}
