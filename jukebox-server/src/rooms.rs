use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json,
};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{DeviceQuery, JoinSchema, NewRoomSchema, ValidatedJson, VoteQuery},
    serialized::{
        JoinResult, NextTrack, ParticipantList, PlaybackStatus, Room, RoomState, RoundResult,
        ToSerialized, VoteResult,
    },
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/rooms",
    tag = "rooms",
    responses(
        (status = 200, body = Vec<Room>)
    )
)]
async fn list_rooms(State(context): State<ServerContext>) -> ServerResult<Json<Vec<Room>>> {
    let rooms = context.collab.rooms.list_rooms().await?;

    Ok(Json(rooms.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms",
    tag = "rooms",
    request_body = NewRoomSchema,
    responses(
        (status = 200, body = Room),
        (status = 404, description = "Host does not exist")
    )
)]
async fn create_room(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewRoomSchema>,
) -> ServerResult<Json<Room>> {
    let like_threshold = body
        .like_threshold
        .unwrap_or(context.collab.config().default_like_threshold);

    let room = context
        .collab
        .rooms
        .create_room(&body.host_spotify_id, like_threshold)
        .await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, body = Room),
        (status = 404, description = "Room does not exist")
    )
)]
async fn room(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
) -> ServerResult<Json<Room>> {
    let room = context.collab.rooms.room_by_code(&code).await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/{code}/join",
    tag = "rooms",
    request_body = JoinSchema,
    params(("code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, body = JoinResult, description = "Participant joined, or was already in the room"),
        (status = 404, description = "Room or participant does not exist")
    )
)]
async fn join(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
    ValidatedJson(body): ValidatedJson<JoinSchema>,
) -> ServerResult<Json<JoinResult>> {
    let outcome = context.collab.members.join(&code, &body.spotify_id).await?;

    Ok(Json(outcome.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{code}/participants",
    tag = "rooms",
    params(("code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, body = ParticipantList)
    )
)]
async fn participants(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
) -> ServerResult<Json<ParticipantList>> {
    let members = context.collab.members.list_participants(&code).await?;

    Ok(Json(ParticipantList::new(&code, &members)))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/{code}/vote",
    tag = "rounds",
    params(("code" = String, Path, description = "Code of the room"), VoteQuery),
    responses(
        (status = 200, body = VoteResult),
        (status = 400, description = "Room has no current track"),
        (status = 403, description = "Participant is not a member of the room")
    )
)]
async fn vote(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
    Query(query): Query<VoteQuery>,
) -> ServerResult<Json<VoteResult>> {
    let result = context
        .collab
        .rounds
        .cast_vote(&code, &query.spotify_id, query.is_like)
        .await?;

    Ok(Json(result.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{code}/random-track",
    tag = "rounds",
    params(("code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, body = RoundResult, description = "A track was picked, or the music service failed"),
        (status = 400, description = "Room has no participants")
    )
)]
async fn random_track(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
) -> ServerResult<Json<RoundResult>> {
    let selection = context.collab.rounds.select_random_track(&code).await?;

    Ok(Json(RoundResult::new(&selection, "ok")))
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{code}/state",
    tag = "rounds",
    params(("code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, body = RoomState)
    )
)]
async fn state(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
) -> ServerResult<Json<RoomState>> {
    let state = context.collab.rounds.state(&code).await?;

    Ok(Json(state.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{code}/next-track",
    tag = "rounds",
    params(("code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, body = NextTrack, description = "Whether the current track can be played")
    )
)]
async fn next_track(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
) -> ServerResult<Json<NextTrack>> {
    let readiness = context.collab.rounds.readiness(&code).await?;

    Ok(Json(readiness.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/{code}/next-round",
    tag = "rounds",
    params(("code" = String, Path, description = "Code of the room")),
    responses(
        (status = 200, body = RoundResult, description = "Votes were cleared and a track was picked, or the music service failed"),
        (status = 400, description = "Room has no participants")
    )
)]
async fn next_round(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
) -> ServerResult<Json<RoundResult>> {
    let selection = context.collab.rounds.advance_round(&code).await?;

    Ok(Json(RoundResult::new(&selection, "next_round_started")))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/{code}/play",
    tag = "playback",
    params(("code" = String, Path, description = "Code of the room"), DeviceQuery),
    responses(
        (status = 200, body = PlaybackStatus),
        (status = 400, description = "Room has no current track"),
        (status = 502, description = "The music service refused")
    )
)]
async fn play(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
    Query(query): Query<DeviceQuery>,
) -> ServerResult<Json<PlaybackStatus>> {
    let outcome = context.collab.playback.play(&code, &query.device_id).await?;

    Ok(Json(outcome.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/{code}/pause",
    tag = "playback",
    params(("code" = String, Path, description = "Code of the room"), DeviceQuery),
    responses(
        (status = 200, body = PlaybackStatus),
        (status = 502, description = "The music service refused")
    )
)]
async fn pause(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
    Query(query): Query<DeviceQuery>,
) -> ServerResult<Json<PlaybackStatus>> {
    let outcome = context.collab.playback.pause(&code, &query.device_id).await?;

    Ok(Json(outcome.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/{code}/resume",
    tag = "playback",
    params(("code" = String, Path, description = "Code of the room"), DeviceQuery),
    responses(
        (status = 200, body = PlaybackStatus),
        (status = 502, description = "The music service refused")
    )
)]
async fn resume(
    State(context): State<ServerContext>,
    Path(code): Path<String>,
    Query(query): Query<DeviceQuery>,
) -> ServerResult<Json<PlaybackStatus>> {
    let outcome = context
        .collab
        .playback
        .resume(&code, &query.device_id)
        .await?;

    Ok(Json(outcome.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_rooms).post(create_room))
        .route("/:code", get(room))
        .route("/:code/join", post(join))
        .route("/:code/participants", get(participants))
        .route("/:code/vote", post(vote))
        .route("/:code/random-track", get(random_track))
        .route("/:code/state", get(state))
        .route("/:code/next-track", get(next_track))
        .route("/:code/next-round", post(next_round))
        .route("/:code/play", post(play))
        .route("/:code/pause", post(pause))
        .route("/:code/resume", post(resume))
}
