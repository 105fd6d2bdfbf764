use chrono::{DateTime, Utc};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A person known through an external music service identity
#[derive(Debug, Clone)]
pub struct ParticipantData {
    pub id: PrimaryKey,
    /// The identifier of this person in the external music service
    pub external_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Opaque credential used to act on the participant's behalf
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// The track under vote in a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackData {
    pub uri: String,
    pub name: String,
    /// Artist names, joined with ", "
    pub artists: String,
    pub image_url: Option<String>,
}

/// A jukebox room
#[derive(Debug, Clone)]
pub struct RoomData {
    pub id: PrimaryKey,
    /// A short code used to share and identify the room
    pub code: String,
    /// The participant that created the room
    pub host_id: PrimaryKey,
    /// How many likes the current track needs before it's ready to play
    pub like_threshold: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Absent until a track has been selected for the room
    pub current_track: Option<TrackData>,
}

/// A participant's membership of a room
#[derive(Debug, Clone)]
pub struct RoomMemberData {
    pub id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub joined_at: DateTime<Utc>,
    pub participant: ParticipantData,
}

/// A like or dislike cast against a specific track of a room.
/// Note: Only votes matching the room's current track count towards its tally.
#[derive(Debug, Clone)]
pub struct VoteData {
    pub id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub participant_id: PrimaryKey,
    pub track_uri: String,
    pub is_like: bool,
    pub cast_at: DateTime<Utc>,
}
