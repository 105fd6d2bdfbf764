use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    Database, DatabaseError, DatabaseResult, NewParticipant, NewRoom, NewRoomMember, NewVote,
    ParticipantData, PrimaryKey, Result, RoomData, RoomMemberData, TrackData,
    UpdatedParticipant, VoteData,
};

/// An in-memory database implementation for jukebox.
/// Every operation runs under a single lock, so inserts are checked and applied atomically.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: PrimaryKey,
    participants: Vec<ParticipantData>,
    rooms: Vec<RoomData>,
    members: Vec<MemberRow>,
    votes: Vec<VoteData>,
}

#[derive(Debug)]
struct MemberRow {
    id: PrimaryKey,
    room_id: PrimaryKey,
    participant_id: PrimaryKey,
    joined_at: DateTime<Utc>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn clear_members(&self, room_id: PrimaryKey) {
        self.tables.lock().members.retain(|m| m.room_id != room_id);
    }
}

impl Tables {
    fn next_id(&mut self) -> PrimaryKey {
        self.last_id += 1;
        self.last_id
    }

    fn participant(&self, participant_id: PrimaryKey) -> Result<&ParticipantData> {
        self.participants
            .iter()
            .find(|p| p.id == participant_id)
            .ok_or(DatabaseError::NotFound {
                resource: "participant",
                identifier: "id",
            })
    }

    fn participant_by_external_id(&self, external_id: &str) -> Result<&ParticipantData> {
        self.participants
            .iter()
            .find(|p| p.external_id == external_id)
            .ok_or(DatabaseError::NotFound {
                resource: "participant",
                identifier: "external_id",
            })
    }

    fn room(&self, room_id: PrimaryKey) -> Result<&RoomData> {
        self.rooms
            .iter()
            .find(|r| r.id == room_id)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            })
    }

    fn room_mut(&mut self, room_id: PrimaryKey) -> Result<&mut RoomData> {
        self.rooms
            .iter_mut()
            .find(|r| r.id == room_id)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            })
    }

    fn room_by_code(&self, code: &str) -> Result<&RoomData> {
        self.rooms
            .iter()
            .find(|r| r.code == code)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "code",
            })
    }

    fn member(&self, row: &MemberRow) -> Result<RoomMemberData> {
        Ok(RoomMemberData {
            id: row.id,
            room_id: row.room_id,
            joined_at: row.joined_at,
            participant: self.participant(row.participant_id)?.clone(),
        })
    }

    fn insert_member(&mut self, new_member: NewRoomMember) -> Result<RoomMemberData> {
        let exists = self
            .members
            .iter()
            .any(|m| {
                m.room_id == new_member.room_id && m.participant_id == new_member.participant_id
            });

        if exists {
            return Err(DatabaseError::Conflict {
                resource: "room member",
                field: "room:participant",
                value: format!("{}:{}", new_member.room_id, new_member.participant_id),
            });
        }

        let row = MemberRow {
            id: self.next_id(),
            room_id: new_member.room_id,
            participant_id: new_member.participant_id,
            joined_at: Utc::now(),
        };

        let member = self.member(&row)?;
        self.members.push(row);

        Ok(member)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn participant_by_id(&self, participant_id: PrimaryKey) -> Result<ParticipantData> {
        self.tables.lock().participant(participant_id).cloned()
    }

    async fn participant_by_external_id(&self, external_id: &str) -> Result<ParticipantData> {
        self.tables
            .lock()
            .participant_by_external_id(external_id)
            .cloned()
    }

    async fn create_participant(
        &self,
        new_participant: NewParticipant,
    ) -> Result<ParticipantData> {
        let mut tables = self.tables.lock();

        tables
            .participant_by_external_id(&new_participant.external_id)
            .conflict_or_ok("participant", "external_id", &new_participant.external_id)?;

        let participant = ParticipantData {
            id: tables.next_id(),
            external_id: new_participant.external_id,
            display_name: new_participant.display_name,
            email: new_participant.email,
            access_token: Some(new_participant.access_token),
            refresh_token: new_participant.refresh_token,
        };

        tables.participants.push(participant.clone());
        Ok(participant)
    }

    async fn update_participant(
        &self,
        updated_participant: UpdatedParticipant,
    ) -> Result<ParticipantData> {
        let mut tables = self.tables.lock();

        let participant = tables
            .participants
            .iter_mut()
            .find(|p| p.id == updated_participant.id)
            .ok_or(DatabaseError::NotFound {
                resource: "participant",
                identifier: "id",
            })?;

        if let Some(display_name) = updated_participant.display_name {
            participant.display_name = Some(display_name);
        }
        if let Some(email) = updated_participant.email {
            participant.email = Some(email);
        }
        if let Some(access_token) = updated_participant.access_token {
            participant.access_token = Some(access_token);
        }
        if let Some(refresh_token) = updated_participant.refresh_token {
            participant.refresh_token = Some(refresh_token);
        }

        Ok(participant.clone())
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        self.tables.lock().room(room_id).cloned()
    }

    async fn room_by_code(&self, code: &str) -> Result<RoomData> {
        self.tables.lock().room_by_code(code).cloned()
    }

    async fn list_rooms(&self) -> Result<Vec<RoomData>> {
        Ok(self.tables.lock().rooms.clone())
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        let mut tables = self.tables.lock();

        tables
            .room_by_code(&new_room.code)
            .conflict_or_ok("room", "code", &new_room.code)?;

        // Ensure the host exists before anything is inserted
        tables.participant(new_room.host_id)?;

        let room = RoomData {
            id: tables.next_id(),
            code: new_room.code,
            host_id: new_room.host_id,
            like_threshold: new_room.like_threshold,
            is_active: true,
            created_at: Utc::now(),
            current_track: None,
        };

        tables.rooms.push(room.clone());

        // Add host as a member to the room
        tables.insert_member(NewRoomMember {
            room_id: room.id,
            participant_id: room.host_id,
        })?;

        Ok(room)
    }

    async fn update_current_track(
        &self,
        room_id: PrimaryKey,
        track: TrackData,
    ) -> Result<RoomData> {
        let mut tables = self.tables.lock();
        let room = tables.room_mut(room_id)?;

        room.current_track = Some(track);
        Ok(room.clone())
    }

    async fn room_members(&self, room_id: PrimaryKey) -> Result<Vec<RoomMemberData>> {
        let tables = self.tables.lock();

        tables
            .members
            .iter()
            .filter(|m| m.room_id == room_id)
            .map(|m| tables.member(m))
            .collect()
    }

    async fn room_member(
        &self,
        room_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<RoomMemberData> {
        let tables = self.tables.lock();

        let row = tables
            .members
            .iter()
            .find(|m| m.room_id == room_id && m.participant_id == participant_id)
            .ok_or(DatabaseError::NotFound {
                resource: "room member",
                identifier: "room_id:participant_id",
            })?;

        tables.member(row)
    }

    async fn create_room_member(&self, new_member: NewRoomMember) -> Result<RoomMemberData> {
        let mut tables = self.tables.lock();

        tables.room(new_member.room_id)?;
        tables.insert_member(new_member)
    }

    async fn create_vote(&self, new_vote: NewVote) -> Result<VoteData> {
        let mut tables = self.tables.lock();

        let vote = VoteData {
            id: tables.next_id(),
            room_id: new_vote.room_id,
            participant_id: new_vote.participant_id,
            track_uri: new_vote.track_uri,
            is_like: new_vote.is_like,
            cast_at: Utc::now(),
        };

        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn count_likes(&self, room_id: PrimaryKey, track_uri: &str) -> Result<u32> {
        let count = self
            .tables
            .lock()
            .votes
            .iter()
            .filter(|v| v.room_id == room_id && v.track_uri == track_uri && v.is_like)
            .count();

        Ok(count as u32)
    }

    async fn delete_votes(&self, room_id: PrimaryKey) -> Result<u64> {
        let mut tables = self.tables.lock();
        let before = tables.votes.len();

        tables.votes.retain(|v| v.room_id != room_id);

        Ok((before - tables.votes.len()) as u64)
    }
}
