use log::info;

use crate::{
    CollabContext, DatabaseError, Identity, NewRoomMember, PrimaryKey, RoomMemberData,
};

use super::RoomError;

/// Adds participants to rooms and lists them
pub struct MembershipManager {
    context: CollabContext,
    identity: Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    Joined,
    AlreadyInRoom,
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub status: JoinStatus,
    pub room_code: String,
    pub participant_id: PrimaryKey,
}

impl MembershipManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            identity: Identity::new(context),
        }
    }

    /// Makes the participant a member of the room.
    /// Joining a room twice is a no-op reported as [JoinStatus::AlreadyInRoom].
    pub async fn join(&self, code: &str, external_id: &str) -> Result<JoinOutcome, RoomError> {
        let room = self.context.room_by_code(code).await?;
        let participant = self
            .identity
            .resolve(external_id)
            .await
            .map_err(RoomError::participant)?;

        let _guard = self.context.locks.lock(room.id).await;
        let db = &self.context.database;

        let status = match db.room_member(room.id, participant.id).await {
            Ok(_) => JoinStatus::AlreadyInRoom,
            Err(DatabaseError::NotFound { .. }) => {
                let created = db
                    .create_room_member(NewRoomMember {
                        room_id: room.id,
                        participant_id: participant.id,
                    })
                    .await;

                match created {
                    Ok(_) => {
                        info!("Participant {} joined room {}", participant.id, room.code);
                        JoinStatus::Joined
                    }
                    // Another process got there first
                    Err(DatabaseError::Conflict { .. }) => JoinStatus::AlreadyInRoom,
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        Ok(JoinOutcome {
            status,
            room_code: room.code,
            participant_id: participant.id,
        })
    }

    /// Returns the members of the room along with when they joined
    pub async fn list_participants(&self, code: &str) -> Result<Vec<RoomMemberData>, RoomError> {
        let room = self.context.room_by_code(code).await?;

        Ok(self.context.database.room_members(room.id).await?)
    }
}
