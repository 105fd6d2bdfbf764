use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::{participants, rooms, schemas, serialized};

#[derive(OpenApi)]
#[openapi(
    info(description = "jukebox-server exposes endpoints to create rooms, vote on tracks, and control playback"),
    paths(
        rooms::list_rooms,
        rooms::create_room,
        rooms::room,
        rooms::join,
        rooms::participants,
        rooms::vote,
        rooms::random_track,
        rooms::state,
        rooms::next_track,
        rooms::next_round,
        rooms::play,
        rooms::pause,
        rooms::resume,
        participants::register,
        participants::participant,
    ),
    components(schemas(
        schemas::NewRoomSchema,
        schemas::JoinSchema,
        schemas::RegisterParticipantSchema,
        serialized::Participant,
        serialized::Room,
        serialized::JoinResult,
        serialized::RoomParticipant,
        serialized::ParticipantList,
        serialized::VoteResult,
        serialized::ChosenUser,
        serialized::PickedTrack,
        serialized::RoundResult,
        serialized::RoomSummary,
        serialized::CurrentTrack,
        serialized::RoomState,
        serialized::NextTrack,
        serialized::PlaybackStatus,
    )),
    tags(
        (name = "rooms", description = "Room creation and membership"),
        (name = "rounds", description = "Track selection and voting"),
        (name = "playback", description = "Playback on the host's device"),
        (name = "participants", description = "Participant registration")
    )
)]
pub struct ApiDoc;

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
