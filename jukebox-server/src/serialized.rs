//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use jukebox_collab::{
    JoinOutcome, JoinStatus, ParticipantData, PlaybackOutcome, Readiness, RoomData,
    RoomMemberData, RoomState as CollabRoomState, RoundSelection, TrackData,
    VoteResult as CollabVoteResult,
};
use serde::Serialize;
use utoipa::ToSchema;

/// A participant's public profile. Tokens are never exposed.
#[derive(Debug, Serialize, ToSchema)]
pub struct Participant {
    id: i32,
    spotify_id: String,
    display_name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Room {
    id: i32,
    code: String,
    host_user_id: i32,
    like_threshold: u32,
    is_active: bool,
    /// RFC 3339 timestamp
    created_at: String,
    current_track_uri: Option<String>,
    current_track_name: Option<String>,
    current_track_artists: Option<String>,
    current_track_image_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResult {
    /// `joined` or `already_in_room`
    status: String,
    room_code: String,
    user_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoomParticipant {
    user_id: i32,
    spotify_id: String,
    display_name: Option<String>,
    email: Option<String>,
    joined_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantList {
    room_code: String,
    participants: Vec<RoomParticipant>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoteResult {
    status: String,
    room_code: String,
    track_uri: String,
    track_name: String,
    likes: u32,
    like_threshold: u32,
    /// Whether the track now has enough likes to be played
    play: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChosenUser {
    id: i32,
    spotify_id: String,
    display_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PickedTrack {
    track_uri: String,
    name: String,
    artists: String,
    image_url: Option<String>,
}

/// The outcome of a track selection. Failures of the music service are reported here, not as errors.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum RoundResult {
    Started {
        /// `ok`, or `next_round_started` when a new round began
        status: String,
        room_code: String,
        chosen_user: ChosenUser,
        track: PickedTrack,
    },
    Failed {
        /// Always `error`
        status: String,
        room_code: String,
        user: ChosenUser,
        error: String,
    },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    code: String,
    like_threshold: u32,
    is_active: bool,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CurrentTrack {
    uri: Option<String>,
    name: Option<String>,
    artists: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoomState {
    room: RoomSummary,
    current_track: CurrentTrack,
    likes: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum NextTrack {
    NotSelected {
        ready_to_play: bool,
        /// Always `no_track_selected`
        reason: String,
    },
    Evaluated {
        ready_to_play: bool,
        track_uri: String,
        name: String,
        artists: String,
        image_url: Option<String>,
        likes: u32,
        threshold: u32,
    },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaybackStatus {
    /// `playing` or `paused`
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    track_uri: Option<String>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<Participant> for ParticipantData {
    fn to_serialized(&self) -> Participant {
        Participant {
            id: self.id,
            spotify_id: self.external_id.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

impl ToSerialized<ChosenUser> for ParticipantData {
    fn to_serialized(&self) -> ChosenUser {
        ChosenUser {
            id: self.id,
            spotify_id: self.external_id.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

impl ToSerialized<Room> for RoomData {
    fn to_serialized(&self) -> Room {
        let track = self.current_track.as_ref();

        Room {
            id: self.id,
            code: self.code.clone(),
            host_user_id: self.host_id,
            like_threshold: self.like_threshold,
            is_active: self.is_active,
            created_at: self.created_at.to_rfc3339(),
            current_track_uri: track.map(|t| t.uri.clone()),
            current_track_name: track.map(|t| t.name.clone()),
            current_track_artists: track.map(|t| t.artists.clone()),
            current_track_image_url: track.and_then(|t| t.image_url.clone()),
        }
    }
}

impl ToSerialized<JoinResult> for JoinOutcome {
    fn to_serialized(&self) -> JoinResult {
        let status = match self.status {
            JoinStatus::Joined => "joined",
            JoinStatus::AlreadyInRoom => "already_in_room",
        };

        JoinResult {
            status: status.to_string(),
            room_code: self.room_code.clone(),
            user_id: self.participant_id,
        }
    }
}

impl ToSerialized<RoomParticipant> for RoomMemberData {
    fn to_serialized(&self) -> RoomParticipant {
        RoomParticipant {
            user_id: self.participant.id,
            spotify_id: self.participant.external_id.clone(),
            display_name: self.participant.display_name.clone(),
            email: self.participant.email.clone(),
            joined_at: self.joined_at.to_rfc3339(),
        }
    }
}

impl ParticipantList {
    pub fn new(room_code: &str, members: &[RoomMemberData]) -> Self {
        Self {
            room_code: room_code.to_string(),
            participants: members.iter().map(|m| m.to_serialized()).collect(),
        }
    }
}

impl ToSerialized<VoteResult> for CollabVoteResult {
    fn to_serialized(&self) -> VoteResult {
        VoteResult {
            status: "vote_registered".to_string(),
            room_code: self.room_code.clone(),
            track_uri: self.track.uri.clone(),
            track_name: self.track.name.clone(),
            likes: self.tally.like_count,
            like_threshold: self.tally.like_threshold,
            play: self.tally.ready_to_play(),
        }
    }
}

impl ToSerialized<PickedTrack> for TrackData {
    fn to_serialized(&self) -> PickedTrack {
        PickedTrack {
            track_uri: self.uri.clone(),
            name: self.name.clone(),
            artists: self.artists.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

impl RoundResult {
    /// Serializes a selection, using `started_status` when a track was picked
    pub fn new(selection: &RoundSelection, started_status: &str) -> Self {
        match selection {
            RoundSelection::Selected {
                room_code,
                chosen,
                track,
            } => Self::Started {
                status: started_status.to_string(),
                room_code: room_code.clone(),
                chosen_user: chosen.to_serialized(),
                track: track.to_serialized(),
            },
            RoundSelection::Failed {
                room_code,
                chosen,
                reason,
            } => Self::Failed {
                status: "error".to_string(),
                room_code: room_code.clone(),
                user: chosen.to_serialized(),
                error: reason.clone(),
            },
        }
    }
}

impl ToSerialized<RoomState> for CollabRoomState {
    fn to_serialized(&self) -> RoomState {
        let current_track = self
            .room
            .current_track
            .as_ref()
            .map(|t| CurrentTrack {
                uri: Some(t.uri.clone()),
                name: Some(t.name.clone()),
                artists: Some(t.artists.clone()),
                image_url: t.image_url.clone(),
            })
            .unwrap_or_default();

        RoomState {
            room: RoomSummary {
                code: self.room.code.clone(),
                like_threshold: self.room.like_threshold,
                is_active: self.room.is_active,
            },
            current_track,
            likes: self.like_count,
        }
    }
}

impl ToSerialized<NextTrack> for Readiness {
    fn to_serialized(&self) -> NextTrack {
        match self {
            Readiness::NoTrackSelected => NextTrack::NotSelected {
                ready_to_play: false,
                reason: "no_track_selected".to_string(),
            },
            Readiness::Evaluated { track, tally } => NextTrack::Evaluated {
                ready_to_play: tally.ready_to_play(),
                track_uri: track.uri.clone(),
                name: track.name.clone(),
                artists: track.artists.clone(),
                image_url: track.image_url.clone(),
                likes: tally.like_count,
                threshold: tally.like_threshold,
            },
        }
    }
}

impl ToSerialized<PlaybackStatus> for PlaybackOutcome {
    fn to_serialized(&self) -> PlaybackStatus {
        let (status, track_uri) = match self {
            PlaybackOutcome::Playing { track_uri } => ("playing", Some(track_uri.clone())),
            PlaybackOutcome::Paused => ("paused", None),
            PlaybackOutcome::Resumed => ("playing", None),
        };

        PlaybackStatus {
            status: status.to_string(),
            track_uri,
        }
    }
}

#[cfg(test)]
mod tests {
    use jukebox_collab::{Readiness, Tally, TrackData};
    use serde_json::json;

    use super::{NextTrack, ToSerialized};

    #[test]
    fn readiness_without_track() {
        let next: NextTrack = Readiness::NoTrackSelected.to_serialized();

        assert_eq!(
            serde_json::to_value(next).unwrap(),
            json!({ "ready_to_play": false, "reason": "no_track_selected" })
        );
    }

    #[test]
    fn readiness_with_track() {
        let readiness = Readiness::Evaluated {
            track: TrackData {
                uri: "spotify:track:one".to_string(),
                name: "One".to_string(),
                artists: "Band".to_string(),
                image_url: None,
            },
            tally: Tally {
                like_count: 3,
                like_threshold: 3,
            },
        };

        let next: NextTrack = readiness.to_serialized();

        assert_eq!(
            serde_json::to_value(next).unwrap(),
            json!({
                "ready_to_play": true,
                "track_uri": "spotify:track:one",
                "name": "One",
                "artists": "Band",
                "image_url": null,
                "likes": 3,
                "threshold": 3
            })
        );
    }
}
