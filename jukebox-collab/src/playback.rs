use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use thiserror::Error;

use crate::{CollabContext, Identity, RoomData, RoomError};

pub type ArcedPlaybackControl = Arc<dyn PlaybackControl>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct PlaybackError {
    pub reason: String,
}

impl PlaybackError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Represents a type that controls playback on a device, acting with the host's token
#[async_trait]
pub trait PlaybackControl: Send + Sync {
    /// Starts playing the track from its beginning
    async fn play(&self, token: &str, device_id: &str, track_uri: &str)
        -> Result<(), PlaybackError>;
    async fn pause(&self, token: &str, device_id: &str) -> Result<(), PlaybackError>;
    async fn resume(&self, token: &str, device_id: &str) -> Result<(), PlaybackError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Playing { track_uri: String },
    Paused,
    Resumed,
}

/// Forwards playback commands of a room to the host's device
pub struct PlaybackGate {
    context: CollabContext,
    identity: Identity,
}

impl PlaybackGate {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            identity: Identity::new(context),
        }
    }

    /// Plays the room's current track on the given device.
    /// Whether the track has enough likes is up to the caller.
    pub async fn play(&self, code: &str, device_id: &str) -> Result<PlaybackOutcome, RoomError> {
        let room = self.context.room_by_code(code).await?;
        let track = room.current_track.clone().ok_or(RoomError::NoCurrentTrack)?;
        let token = self.host_token(&room).await?;

        self.context
            .playback
            .play(&token, device_id, &track.uri)
            .await
            .map_err(|e| external(&room, e))?;

        info!("Playing {} in room {}", track.uri, room.code);

        Ok(PlaybackOutcome::Playing {
            track_uri: track.uri,
        })
    }

    pub async fn pause(&self, code: &str, device_id: &str) -> Result<PlaybackOutcome, RoomError> {
        let room = self.context.room_by_code(code).await?;
        let token = self.host_token(&room).await?;

        self.context
            .playback
            .pause(&token, device_id)
            .await
            .map_err(|e| external(&room, e))?;

        info!("Paused playback in room {}", room.code);
        Ok(PlaybackOutcome::Paused)
    }

    pub async fn resume(&self, code: &str, device_id: &str) -> Result<PlaybackOutcome, RoomError> {
        let room = self.context.room_by_code(code).await?;
        let token = self.host_token(&room).await?;

        self.context
            .playback
            .resume(&token, device_id)
            .await
            .map_err(|e| external(&room, e))?;

        info!("Resumed playback in room {}", room.code);
        Ok(PlaybackOutcome::Resumed)
    }

    async fn host_token(&self, room: &RoomData) -> Result<String, RoomError> {
        self.identity
            .capability_token(room.host_id)
            .await
            .map_err(RoomError::host)
    }
}

fn external(room: &RoomData, error: PlaybackError) -> RoomError {
    warn!("Playback failed in room {}: {}", room.code, error);
    RoomError::External(error.reason)
}

#[cfg(test)]
mod tests {
    use crate::{testing::Fixture, Database, RoomError, UpdatedParticipant};

    use super::PlaybackOutcome;

    #[tokio::test]
    async fn play_requires_a_current_track() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(1, &[]).await;

        let result = fixture.collab.playback.play(&code, "device").await;

        assert!(matches!(result, Err(RoomError::NoCurrentTrack)));
        assert!(fixture.playback.commands().is_empty());
    }

    #[tokio::test]
    async fn play_uses_host_token_and_current_track() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(3, &["john"]).await;

        fixture.picker.push_track("spotify:track:song");
        fixture.collab.rounds.select_random_track(&code).await.unwrap();

        // The track is played even without enough likes
        let outcome = fixture.collab.playback.play(&code, "kitchen").await.unwrap();

        assert_eq!(
            outcome,
            PlaybackOutcome::Playing {
                track_uri: "spotify:track:song".to_string()
            }
        );
        assert_eq!(
            fixture.playback.commands(),
            vec!["play token-host kitchen spotify:track:song".to_string()]
        );
    }

    #[tokio::test]
    async fn pause_and_resume_do_not_need_a_track() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(1, &[]).await;
        let playback = &fixture.collab.playback;

        assert_eq!(
            playback.pause(&code, "desk").await.unwrap(),
            PlaybackOutcome::Paused
        );
        assert_eq!(
            playback.resume(&code, "desk").await.unwrap(),
            PlaybackOutcome::Resumed
        );
        assert_eq!(
            fixture.playback.commands(),
            vec!["pause token-host desk", "resume token-host desk"]
        );
    }

    #[tokio::test]
    async fn missing_host_token() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(1, &[]).await;
        let host = fixture.participant("host").await;

        fixture
            .database
            .update_participant(UpdatedParticipant {
                id: host.id,
                access_token: Some(String::new()),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = fixture.collab.playback.pause(&code, "desk").await;

        assert!(matches!(result, Err(RoomError::HostTokenMissing)));
    }

    #[tokio::test]
    async fn playback_failure_is_passed_through() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(1, &[]).await;
        fixture.playback.fail_with("playback_failed (404): no active device");

        let result = fixture.collab.playback.resume(&code, "desk").await;

        match result {
            Err(RoomError::External(reason)) => {
                assert_eq!(reason, "playback_failed (404): no active device")
            }
            other => panic!("expected an external failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_room() {
        let fixture = Fixture::new();
        let result = fixture.collab.playback.pause("NOPE00", "desk").await;

        assert!(matches!(result, Err(RoomError::RoomNotFound)));
    }
}
