//! Fakes and fixtures shared by the tests of this crate

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::{
    Collab, Config, MemoryDatabase, NewParticipant, ParticipantData, PickError, PlaybackControl,
    PlaybackError, Profile, ProfileError, ProfileLookup, RoomData, TrackData, TrackPicker,
};

impl TrackData {
    pub fn mock(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            name: format!("Track {uri}"),
            artists: "Some Artist".to_string(),
            image_url: None,
        }
    }
}

/// Hands out scripted results in order and records the tokens it was called with
#[derive(Default)]
pub struct ScriptedPicker {
    results: Mutex<VecDeque<Result<TrackData, PickError>>>,
    tokens: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedPicker {
    pub fn push_track(&self, uri: &str) {
        self.results.lock().push_back(Ok(TrackData::mock(uri)));
    }

    pub fn push_error(&self, reason: &str) {
        self.results.lock().push_back(Err(PickError::new(reason)));
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().clone()
    }

    /// Makes the next pick wait until the returned notify is triggered
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock() = Some(notify.clone());

        notify
    }
}

#[async_trait]
impl TrackPicker for ScriptedPicker {
    async fn pick_track(&self, token: &str) -> Result<TrackData, PickError> {
        self.tokens.lock().push(token.to_string());

        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(PickError::new("nothing scripted")))
    }
}

/// Records every successful playback command as `<command> <token> <device> [uri]`
#[derive(Default)]
pub struct RecordingPlayback {
    commands: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
}

impl RecordingPlayback {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// Makes every following command fail with the reason
    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock() = Some(reason.to_string());
    }

    fn record(&self, command: String) -> Result<(), PlaybackError> {
        if let Some(reason) = self.failure.lock().clone() {
            return Err(PlaybackError::new(reason));
        }

        self.commands.lock().push(command);
        Ok(())
    }
}

#[async_trait]
impl PlaybackControl for RecordingPlayback {
    async fn play(
        &self,
        token: &str,
        device_id: &str,
        track_uri: &str,
    ) -> Result<(), PlaybackError> {
        self.record(format!("play {token} {device_id} {track_uri}"))
    }

    async fn pause(&self, token: &str, device_id: &str) -> Result<(), PlaybackError> {
        self.record(format!("pause {token} {device_id}"))
    }

    async fn resume(&self, token: &str, device_id: &str) -> Result<(), PlaybackError> {
        self.record(format!("resume {token} {device_id}"))
    }
}

/// Knows which account each added token belongs to
#[derive(Default)]
pub struct KnownProfiles {
    accounts: Mutex<HashMap<String, String>>,
}

impl KnownProfiles {
    pub fn add(&self, token: &str, external_id: &str) {
        self.accounts
            .lock()
            .insert(token.to_string(), external_id.to_string());
    }
}

#[async_trait]
impl ProfileLookup for KnownProfiles {
    async fn current_profile(&self, token: &str) -> Result<Profile, ProfileError> {
        let external_id = self
            .accounts
            .lock()
            .get(token)
            .cloned()
            .ok_or_else(|| ProfileError::new("profile_failed (401): invalid token"))?;

        let mut display_name = external_id.clone();
        display_name[..1].make_ascii_uppercase();

        Ok(Profile {
            external_id,
            display_name: Some(display_name),
            email: None,
        })
    }
}

/// A collab system over an in-memory database, with fake collaborators
pub struct Fixture {
    pub collab: Collab,
    pub database: Arc<MemoryDatabase>,
    pub picker: Arc<ScriptedPicker>,
    pub playback: Arc<RecordingPlayback>,
    pub profiles: Arc<KnownProfiles>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_code_length(room_code_length: usize) -> Self {
        Self::with_config(Config {
            room_code_length,
            ..Default::default()
        })
    }

    fn with_config(config: Config) -> Self {
        let database = Arc::new(MemoryDatabase::new());
        let picker = Arc::new(ScriptedPicker::default());
        let playback = Arc::new(RecordingPlayback::default());
        let profiles = Arc::new(KnownProfiles::default());

        let collab = Collab::new(
            config,
            database.clone(),
            picker.clone(),
            playback.clone(),
            profiles.clone(),
        );

        Self {
            collab,
            database,
            picker,
            playback,
            profiles,
        }
    }

    /// Registers a participant whose token is `token-<external_id>`
    pub async fn participant(&self, external_id: &str) -> ParticipantData {
        self.collab
            .identity
            .register(NewParticipant {
                external_id: external_id.to_string(),
                display_name: Some(external_id.to_string()),
                email: None,
                access_token: format!("token-{external_id}"),
                refresh_token: None,
            })
            .await
            .unwrap()
    }

    pub async fn room(&self, host: &str, like_threshold: u32) -> RoomData {
        self.collab
            .rooms
            .create_room(host, like_threshold)
            .await
            .unwrap()
    }

    /// Creates a room hosted by `host` which the given participants have joined, and returns its code
    pub async fn room_with_members(&self, like_threshold: u32, members: &[&str]) -> String {
        self.participant("host").await;
        let room = self.room("host", like_threshold).await;

        for member in members {
            self.participant(member).await;
            self.collab.members.join(&room.code, member).await.unwrap();
        }

        room.code
    }

    /// Creates a room that even the host has left
    pub async fn empty_room(&self, like_threshold: u32) -> RoomData {
        self.participant("host").await;
        let room = self.room("host", like_threshold).await;
        self.database.clear_members(room.id);

        room
    }
}
