use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json,
};
use jukebox_collab::Credentials;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{RegisterParticipantSchema, ValidatedJson},
    serialized::{Participant, ToSerialized},
    Router,
};

#[utoipa::path(
    put,
    path = "/v1/participants",
    tag = "participants",
    request_body = RegisterParticipantSchema,
    responses(
        (status = 200, body = Participant, description = "Participant was registered, or their profile and token refreshed"),
        (status = 401, description = "The music service did not accept the access token")
    )
)]
async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterParticipantSchema>,
) -> ServerResult<Json<Participant>> {
    let participant = context
        .collab
        .identity
        .sign_in(Credentials {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
        })
        .await?;

    Ok(Json(participant.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/participants/{spotify_id}",
    tag = "participants",
    params(("spotify_id" = String, Path, description = "External identity of the participant")),
    responses(
        (status = 200, body = Participant),
        (status = 404, description = "Participant does not exist")
    )
)]
async fn participant(
    State(context): State<ServerContext>,
    Path(spotify_id): Path<String>,
) -> ServerResult<Json<Participant>> {
    let participant = context.collab.identity.resolve(&spotify_id).await?;

    Ok(Json(participant.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", put(register))
        .route("/:spotify_id", get(participant))
}
