use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jukebox_collab::{DatabaseError, ErrorKind, IdentityError, RoomError};
use log::error;
use serde_json::json;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidInput(String),
    /// A collaborator such as the music service failed
    #[error("{0}")]
    External(String),
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PreconditionFailed(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<RoomError> for ServerError {
    fn from(value: RoomError) -> Self {
        let message = value.to_string();

        match value {
            RoomError::NotAMember => Self::Forbidden(message),
            RoomError::External(reason) => Self::External(reason),
            RoomError::Db(e) => e.into(),
            e => match e.kind() {
                ErrorKind::NotFound => Self::NotFound(message),
                ErrorKind::PreconditionFailed => Self::PreconditionFailed(message),
                ErrorKind::InvalidInput => Self::InvalidInput(message),
                ErrorKind::ExternalFailure | ErrorKind::Internal => Self::Unknown(message),
            },
        }
    }
}

impl From<IdentityError> for ServerError {
    fn from(value: IdentityError) -> Self {
        match value {
            IdentityError::NotFound => Self::NotFound(value.to_string()),
            IdentityError::TokenMissing => Self::PreconditionFailed(value.to_string()),
            IdentityError::Unverified(_) => Self::Unauthorized(value.to_string()),
            IdentityError::Db(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound { .. } => Self::NotFound(value.to_string()),
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}
