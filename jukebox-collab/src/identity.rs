use log::info;
use thiserror::Error;

use crate::{
    ArcedDatabase, ArcedProfileLookup, CollabContext, DatabaseError, NewParticipant,
    ParticipantData, PrimaryKey, UpdatedParticipant,
};

/// Maps external identities to participants and holds their capability tokens.
#[derive(Clone)]
pub struct Identity {
    db: ArcedDatabase,
    profiles: ArcedProfileLookup,
}

/// Tokens handed over by a participant signing in
#[derive(Debug)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Participant does not exist")]
    NotFound,
    /// The participant exists, but has no usable capability token
    #[error("Participant has no capability token")]
    TokenMissing,
    /// The music service would not say who the token belongs to
    #[error("Token could not be verified: {0}")]
    Unverified(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

impl From<DatabaseError> for IdentityError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound { .. } => Self::NotFound,
            err => Self::Db(err),
        }
    }
}

impl Identity {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            db: context.database.clone(),
            profiles: context.profiles.clone(),
        }
    }

    /// Signs a participant in with their tokens. The external identity and
    /// profile are taken from the account the access token belongs to.
    pub async fn sign_in(
        &self,
        credentials: Credentials,
    ) -> Result<ParticipantData, IdentityError> {
        let profile = self
            .profiles
            .current_profile(&credentials.access_token)
            .await
            .map_err(|e| IdentityError::Unverified(e.reason))?;

        self.register(NewParticipant {
            external_id: profile.external_id,
            display_name: profile.display_name,
            email: profile.email,
            access_token: credentials.access_token,
            refresh_token: credentials.refresh_token,
        })
        .await
    }

    /// Registers a participant on first sight of their external identity,
    /// or refreshes their profile and token if they are already known.
    pub async fn register(
        &self,
        new_participant: NewParticipant,
    ) -> Result<ParticipantData, IdentityError> {
        let existing = self
            .db
            .participant_by_external_id(&new_participant.external_id)
            .await;

        let participant = match existing {
            Ok(participant) => {
                self.db
                    .update_participant(UpdatedParticipant {
                        id: participant.id,
                        display_name: new_participant.display_name,
                        email: new_participant.email,
                        access_token: Some(new_participant.access_token),
                        refresh_token: new_participant.refresh_token,
                    })
                    .await?
            }
            Err(DatabaseError::NotFound { .. }) => {
                let participant = self.db.create_participant(new_participant).await?;
                info!("Registered participant {}", participant.id);

                participant
            }
            Err(err) => return Err(IdentityError::Db(err)),
        };

        Ok(participant)
    }

    /// Returns the participant with the given external identity
    pub async fn resolve(&self, external_id: &str) -> Result<ParticipantData, IdentityError> {
        Ok(self.db.participant_by_external_id(external_id).await?)
    }

    pub async fn participant(
        &self,
        participant_id: PrimaryKey,
    ) -> Result<ParticipantData, IdentityError> {
        Ok(self.db.participant_by_id(participant_id).await?)
    }

    /// Returns the token used to act on the participant's behalf.
    /// An empty token is treated as missing.
    pub async fn capability_token(
        &self,
        participant_id: PrimaryKey,
    ) -> Result<String, IdentityError> {
        self.participant(participant_id)
            .await?
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(IdentityError::TokenMissing)
    }
}
