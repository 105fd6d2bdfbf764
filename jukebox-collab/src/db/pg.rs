use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::PgPoolOptions, query, query_as, query_scalar, Error as SqlxError, FromRow, PgPool,
};

use crate::{
    Database, DatabaseError, DatabaseResult, IntoDatabaseError, NewParticipant, NewRoom,
    NewRoomMember, NewVote, ParticipantData, PrimaryKey, Result, RoomData, RoomMemberData,
    TrackData, UpdatedParticipant, VoteData,
};

/// A postgres database implementation for jukebox
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(FromRow)]
struct ParticipantRow {
    id: PrimaryKey,
    external_id: String,
    display_name: Option<String>,
    email: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(FromRow)]
struct RoomRow {
    id: PrimaryKey,
    code: String,
    host_id: PrimaryKey,
    like_threshold: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    current_track_uri: Option<String>,
    current_track_name: Option<String>,
    current_track_artists: Option<String>,
    current_track_image_url: Option<String>,
}

#[derive(FromRow)]
struct MemberRow {
    id: PrimaryKey,
    room_id: PrimaryKey,
    joined_at: DateTime<Utc>,
    participant_id: PrimaryKey,
    external_id: String,
    display_name: Option<String>,
    email: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(FromRow)]
struct VoteRow {
    id: PrimaryKey,
    room_id: PrimaryKey,
    participant_id: PrimaryKey,
    track_uri: String,
    is_like: bool,
    cast_at: DateTime<Utc>,
}

const MEMBER_SELECT: &str = "
    SELECT
        room_members.id,
        room_members.room_id,
        room_members.joined_at,
        participants.id AS participant_id,
        participants.external_id,
        participants.display_name,
        participants.email,
        participants.access_token,
        participants.refresh_token
    FROM room_members
        INNER JOIN participants ON room_members.participant_id = participants.id";

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn participant_by_id(&self, participant_id: PrimaryKey) -> Result<ParticipantData> {
        query_as::<_, ParticipantRow>("SELECT * FROM participants WHERE id = $1")
            .bind(participant_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("participant", "id"))
    }

    async fn participant_by_external_id(&self, external_id: &str) -> Result<ParticipantData> {
        query_as::<_, ParticipantRow>("SELECT * FROM participants WHERE external_id = $1")
            .bind(external_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("participant", "external_id"))
    }

    async fn create_participant(
        &self,
        new_participant: NewParticipant,
    ) -> Result<ParticipantData> {
        self.participant_by_external_id(&new_participant.external_id)
            .await
            .conflict_or_ok("participant", "external_id", &new_participant.external_id)?;

        query_as::<_, ParticipantRow>(
            "INSERT INTO participants (external_id, display_name, email, access_token, refresh_token)
            VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&new_participant.external_id)
        .bind(new_participant.display_name)
        .bind(new_participant.email)
        .bind(new_participant.access_token)
        .bind(new_participant.refresh_token)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.conflict_or_any("participant", "external_id", &new_participant.external_id))
    }

    async fn update_participant(
        &self,
        updated_participant: UpdatedParticipant,
    ) -> Result<ParticipantData> {
        let participant = self.participant_by_id(updated_participant.id).await?;

        query(
            "UPDATE participants SET
                display_name = $1,
                email = $2,
                access_token = $3,
                refresh_token = $4
            WHERE id = $5",
        )
        .bind(updated_participant.display_name.or(participant.display_name))
        .bind(updated_participant.email.or(participant.email))
        .bind(updated_participant.access_token.or(participant.access_token))
        .bind(updated_participant.refresh_token.or(participant.refresh_token))
        .bind(updated_participant.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.participant_by_id(updated_participant.id).await
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        query_as::<_, RoomRow>("SELECT * FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("room", "id"))
    }

    async fn room_by_code(&self, code: &str) -> Result<RoomData> {
        query_as::<_, RoomRow>("SELECT * FROM rooms WHERE code = $1")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("room", "code"))
    }

    async fn list_rooms(&self) -> Result<Vec<RoomData>> {
        let rooms = query_as::<_, RoomRow>("SELECT * FROM rooms")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(rooms)
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        self.room_by_code(&new_room.code)
            .await
            .conflict_or_ok("room", "code", &new_room.code)?;

        let like_threshold = i32::try_from(new_room.like_threshold)
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        let host = self.participant_by_id(new_room.host_id).await?;
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        let room = query_as::<_, RoomRow>(
            "
            INSERT INTO rooms (code, host_id, like_threshold, is_active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING *",
        )
        .bind(&new_room.code)
        .bind(host.id)
        .bind(like_threshold)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.conflict_or_any("room", "code", &new_room.code))?;

        // Add host as a member to the room
        query("INSERT INTO room_members (room_id, participant_id) VALUES ($1, $2)")
            .bind(room.id)
            .bind(host.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        Ok(room.into())
    }

    async fn update_current_track(
        &self,
        room_id: PrimaryKey,
        track: TrackData,
    ) -> Result<RoomData> {
        query_as::<_, RoomRow>(
            "UPDATE rooms SET
                current_track_uri = $1,
                current_track_name = $2,
                current_track_artists = $3,
                current_track_image_url = $4
            WHERE id = $5
            RETURNING *",
        )
        .bind(track.uri)
        .bind(track.name)
        .bind(track.artists)
        .bind(track.image_url)
        .bind(room_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("room", "id"))
    }

    async fn room_members(&self, room_id: PrimaryKey) -> Result<Vec<RoomMemberData>> {
        let members = query_as::<_, MemberRow>(&format!(
            "{MEMBER_SELECT} WHERE room_members.room_id = $1 ORDER BY room_members.joined_at"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(Into::into)
        .collect();

        Ok(members)
    }

    async fn room_member(
        &self,
        room_id: PrimaryKey,
        participant_id: PrimaryKey,
    ) -> Result<RoomMemberData> {
        query_as::<_, MemberRow>(&format!(
            "{MEMBER_SELECT} WHERE room_members.room_id = $1 AND room_members.participant_id = $2"
        ))
        .bind(room_id)
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("room member", "room_id:participant_id"))
    }

    async fn create_room_member(&self, new_member: NewRoomMember) -> Result<RoomMemberData> {
        let key = format!("{}:{}", new_member.room_id, new_member.participant_id);

        // Ensure the participant isn't a member of this room already
        self.room_member(new_member.room_id, new_member.participant_id)
            .await
            .conflict_or_ok("room member", "room:participant", &key)?;

        query("INSERT INTO room_members (room_id, participant_id) VALUES ($1, $2)")
            .bind(new_member.room_id)
            .bind(new_member.participant_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.conflict_or_any("room member", "room:participant", &key))?;

        self.room_member(new_member.room_id, new_member.participant_id)
            .await
    }

    async fn create_vote(&self, new_vote: NewVote) -> Result<VoteData> {
        query_as::<_, VoteRow>(
            "
            INSERT INTO votes (room_id, participant_id, track_uri, is_like)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(new_vote.room_id)
        .bind(new_vote.participant_id)
        .bind(new_vote.track_uri)
        .bind(new_vote.is_like)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn count_likes(&self, room_id: PrimaryKey, track_uri: &str) -> Result<u32> {
        let count: i64 = query_scalar(
            "SELECT COUNT(id) FROM votes WHERE room_id = $1 AND track_uri = $2 AND is_like = TRUE",
        )
        .bind(room_id)
        .bind(track_uri)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(count as u32)
    }

    async fn delete_votes(&self, room_id: PrimaryKey) -> Result<u64> {
        query("DELETE FROM votes WHERE room_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.any())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}

trait UniqueViolation {
    /// Turns a unique constraint violation into a conflict, for inserts that race a lookup
    fn conflict_or_any(self, resource: &'static str, field: &'static str, value: &str)
        -> DatabaseError;
}

impl UniqueViolation for SqlxError {
    fn conflict_or_any(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError {
        if let SqlxError::Database(e) = &self {
            if e.is_unique_violation() {
                return DatabaseError::Conflict {
                    resource,
                    field,
                    value: value.to_string(),
                };
            }
        }

        self.any()
    }
}

impl From<ParticipantRow> for ParticipantData {
    fn from(row: ParticipantRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            display_name: row.display_name,
            email: row.email,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
        }
    }
}

impl From<RoomRow> for RoomData {
    fn from(row: RoomRow) -> Self {
        let current_track = row.current_track_uri.map(|uri| TrackData {
            uri,
            name: row.current_track_name.unwrap_or_default(),
            artists: row.current_track_artists.unwrap_or_default(),
            image_url: row.current_track_image_url,
        });

        Self {
            id: row.id,
            code: row.code,
            host_id: row.host_id,
            like_threshold: u32::try_from(row.like_threshold).unwrap_or_default(),
            is_active: row.is_active,
            created_at: row.created_at,
            current_track,
        }
    }
}

impl From<MemberRow> for RoomMemberData {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id,
            joined_at: row.joined_at,
            participant: ParticipantData {
                id: row.participant_id,
                external_id: row.external_id,
                display_name: row.display_name,
                email: row.email,
                access_token: row.access_token,
                refresh_token: row.refresh_token,
            },
        }
    }
}

impl From<VoteRow> for VoteData {
    fn from(row: VoteRow) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id,
            participant_id: row.participant_id,
            track_uri: row.track_uri,
            is_like: row.is_like,
            cast_at: row.cast_at,
        }
    }
}
