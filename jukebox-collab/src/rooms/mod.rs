mod locks;
mod membership;
mod round;

use log::{debug, info};
use thiserror::Error;

use crate::{
    util::random_code, CollabContext, DatabaseError, Identity, IdentityError, NewRoom, RoomData,
};

pub use locks::*;
pub use membership::*;
pub use round::*;

/// Creates rooms and looks them up by code
pub struct RoomManager {
    context: CollabContext,
    identity: Identity,
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room does not exist")]
    RoomNotFound,
    #[error("Host does not exist")]
    HostNotFound,
    #[error("Participant does not exist")]
    ParticipantNotFound,
    #[error("Participant is not a member of this room")]
    NotAMember,
    #[error("Room has no current track")]
    NoCurrentTrack,
    #[error("Room has no participants")]
    NoParticipants,
    #[error("Host has no capability token")]
    HostTokenMissing,
    /// The participant drawn for a track pick has no capability token
    #[error("Participant has no capability token")]
    ParticipantTokenMissing,
    #[error("Like threshold must be between 1 and 2147483647")]
    InvalidThreshold,
    /// A collaborator failed, with its reason passed through verbatim
    #[error("External failure: {0}")]
    External(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// Broad classification of a [RoomError]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PreconditionFailed,
    InvalidInput,
    ExternalFailure,
    Internal,
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound | Self::HostNotFound | Self::ParticipantNotFound => {
                ErrorKind::NotFound
            }
            Self::NotAMember
            | Self::NoCurrentTrack
            | Self::NoParticipants
            | Self::HostTokenMissing
            | Self::ParticipantTokenMissing => ErrorKind::PreconditionFailed,
            Self::InvalidThreshold => ErrorKind::InvalidInput,
            Self::External(_) => ErrorKind::ExternalFailure,
            Self::Db(_) => ErrorKind::Internal,
        }
    }

    /// Maps an identity error for a lookup of the given participant role
    fn from_identity(error: IdentityError, not_found: Self, token_missing: Self) -> Self {
        match error {
            IdentityError::NotFound => not_found,
            IdentityError::TokenMissing => token_missing,
            IdentityError::Unverified(reason) => Self::External(reason),
            IdentityError::Db(e) => Self::Db(e),
        }
    }

    pub(crate) fn participant(error: IdentityError) -> Self {
        Self::from_identity(
            error,
            Self::ParticipantNotFound,
            Self::ParticipantTokenMissing,
        )
    }

    pub(crate) fn host(error: IdentityError) -> Self {
        Self::from_identity(error, Self::HostNotFound, Self::HostTokenMissing)
    }
}

impl RoomManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            identity: Identity::new(context),
        }
    }

    /// Creates a new room hosted by the given participant.
    /// The host becomes the first member of the room.
    pub async fn create_room(
        &self,
        host_external_id: &str,
        like_threshold: u32,
    ) -> Result<RoomData, RoomError> {
        // Thresholds are stored as a postgres INTEGER
        if like_threshold == 0 || i32::try_from(like_threshold).is_err() {
            return Err(RoomError::InvalidThreshold);
        }

        let host = self
            .identity
            .resolve(host_external_id)
            .await
            .map_err(RoomError::host)?;

        // Codes are drawn until one is free, the database being the judge of uniqueness
        loop {
            let code = random_code(self.context.config.room_code_length);

            let result = self
                .context
                .database
                .create_room(NewRoom {
                    code: code.clone(),
                    host_id: host.id,
                    like_threshold,
                })
                .await;

            match result {
                Err(DatabaseError::Conflict { field: "code", .. }) => {
                    debug!("Room code {} is taken, drawing another", code);
                }
                result => {
                    let room = result?;
                    info!("Room {} created by participant {}", room.code, host.id);

                    return Ok(room);
                }
            }
        }
    }

    pub async fn room_by_code(&self, code: &str) -> Result<RoomData, RoomError> {
        self.context.room_by_code(code).await
    }

    /// Get all rooms, in no particular order
    pub async fn list_rooms(&self) -> Result<Vec<RoomData>, RoomError> {
        Ok(self.context.database.list_rooms().await?)
    }
}
