use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type ArcedDatabase = Arc<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound { .. } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can store jukebox state.
///
/// Implementations must uphold the uniqueness of room codes, participant
/// external ids, and (room, participant) memberships by returning
/// [DatabaseError::Conflict] instead of inserting a duplicate.
#[async_trait]
pub trait Database: Send + Sync {
    async fn participant_by_id(&self, participant_id: PrimaryKey) -> Result<ParticipantData>;
    async fn participant_by_external_id(&self, external_id: &str) -> Result<ParticipantData>;
    async fn create_participant(&self, new_participant: NewParticipant)
        -> Result<ParticipantData>;
    async fn update_participant(
        &self,
        updated_participant: UpdatedParticipant,
    ) -> Result<ParticipantData>;

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData>;
    async fn room_by_code(&self, code: &str) -> Result<RoomData>;
    async fn list_rooms(&self) -> Result<Vec<RoomData>>;
    /// Creates the room and adds its host as the first member
    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData>;
    async fn update_current_track(&self, room_id: PrimaryKey, track: TrackData)
        -> Result<RoomData>;

    async fn room_members(&self, room_id: PrimaryKey) -> Result<Vec<RoomMemberData>>;
    async fn room_member(
        &self,
        room_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<RoomMemberData>;
    async fn create_room_member(&self, new_member: NewRoomMember) -> Result<RoomMemberData>;

    async fn create_vote(&self, new_vote: NewVote) -> Result<VoteData>;
    /// Counts the likes cast against the given track of a room
    async fn count_likes(&self, room_id: PrimaryKey, track_uri: &str) -> Result<u32>;
    /// Deletes every vote of a room, returning how many were deleted
    async fn delete_votes(&self, room_id: PrimaryKey) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub external_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Fields left as `None` keep their stored value
#[derive(Debug, Default)]
pub struct UpdatedParticipant {
    pub id: PrimaryKey,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug)]
pub struct NewRoom {
    pub code: String,
    /// The host of the new room
    pub host_id: PrimaryKey,
    pub like_threshold: u32,
}

#[derive(Debug)]
pub struct NewRoomMember {
    pub room_id: PrimaryKey,
    pub participant_id: PrimaryKey,
}

#[derive(Debug)]
pub struct NewVote {
    pub room_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub track_uri: String,
    pub is_like: bool,
}
