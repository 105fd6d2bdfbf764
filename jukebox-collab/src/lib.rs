mod config;
mod db;
mod identity;
mod picker;
mod playback;
mod profile;
mod rooms;
mod spotify;
mod util;

#[cfg(test)]
mod testing;

pub use config::*;
pub use db::*;
pub use identity::*;
pub use picker::*;
pub use playback::*;
pub use profile::*;
pub use rooms::*;
pub use spotify::*;

/// The jukebox collab system, facilitating rooms, membership, voting rounds, and playback.
pub struct Collab {
    config: Config,

    pub identity: Identity,
    pub rooms: RoomManager,
    pub members: MembershipManager,
    pub rounds: RoundEngine,
    pub playback: PlaybackGate,
}

/// A type passed to various components of the collab system, to access state and collaborators.
#[derive(Clone)]
pub struct CollabContext {
    pub config: Config,
    pub database: ArcedDatabase,
    pub picker: ArcedTrackPicker,
    pub playback: ArcedPlaybackControl,
    pub profiles: ArcedProfileLookup,

    pub locks: RoomLocks,
}

impl Collab {
    pub fn new(
        config: Config,
        database: ArcedDatabase,
        picker: ArcedTrackPicker,
        playback: ArcedPlaybackControl,
        profiles: ArcedProfileLookup,
    ) -> Self {
        let context = CollabContext {
            config: config.clone(),
            database,
            picker,
            playback,
            profiles,

            locks: Default::default(),
        };

        Self {
            config,
            identity: Identity::new(&context),
            rooms: RoomManager::new(&context),
            members: MembershipManager::new(&context),
            rounds: RoundEngine::new(&context),
            playback: PlaybackGate::new(&context),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl CollabContext {
    /// Looks up a room by its code, reporting a missing room as [RoomError::RoomNotFound]
    pub async fn room_by_code(&self, code: &str) -> std::result::Result<RoomData, RoomError> {
        self.database
            .room_by_code(code)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => RoomError::RoomNotFound,
                e => RoomError::Db(e),
            })
    }
}
