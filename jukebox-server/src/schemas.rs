use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewRoomSchema {
    #[validate(length(min = 1, max = 128))]
    pub host_spotify_id: String,
    /// How many likes a track needs before it can be played. Defaults to 3.
    #[validate(range(min = 1, max = 2147483647))]
    pub like_threshold: Option<u32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinSchema {
    #[validate(length(min = 1, max = 128))]
    pub spotify_id: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterParticipantSchema {
    /// The participant is whoever the music service says this token belongs to
    #[validate(length(min = 1))]
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VoteQuery {
    /// The external identity of the voter
    pub spotify_id: String,
    /// Whether the vote is a like, true when omitted
    #[serde(default = "like_by_default")]
    pub is_like: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeviceQuery {
    /// The device of the host that should act
    pub device_id: String,
}

fn like_by_default() -> bool {
    true
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| {
                ServerError::InvalidInput(format!("JSON parse failed: {}", e.body_text()))
            })?;

        extracted_json
            .0
            .validate()
            .map_err(|e| ServerError::InvalidInput(format!("Request body is invalid: {}", e)))?;

        Ok(Self(extracted_json.0))
    }
}
