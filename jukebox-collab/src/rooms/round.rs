//! The voting round of a room.
//!
//! A room either has no track, or a current track that participants vote on.
//! Whether the track is ready to play is never stored: it is computed from the
//! likes cast against the current track whenever it's asked for.

use log::{debug, info, warn};
use rand::seq::SliceRandom;

use crate::{
    CollabContext, DatabaseError, Identity, NewVote, ParticipantData, RoomData, TrackData,
};

use super::RoomError;

/// Selects tracks, collects votes, and advances rounds
pub struct RoundEngine {
    context: CollabContext,
    identity: Identity,
}

/// The likes of the current track measured against the room's threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub like_count: u32,
    pub like_threshold: u32,
}

/// The result of drawing a participant and picking a track from their library
#[derive(Debug, Clone)]
pub enum RoundSelection {
    /// The track is now the room's current track
    Selected {
        room_code: String,
        chosen: ParticipantData,
        track: TrackData,
    },
    /// The track picker failed. The room's current track was left as it was.
    Failed {
        room_code: String,
        chosen: ParticipantData,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct VoteResult {
    pub room_code: String,
    /// The track the vote was cast against
    pub track: TrackData,
    pub tally: Tally,
}

/// A read-only snapshot of a room
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: RoomData,
    /// Likes for the current track, 0 if there is none
    pub like_count: u32,
}

#[derive(Debug, Clone)]
pub enum Readiness {
    NoTrackSelected,
    Evaluated { track: TrackData, tally: Tally },
}

impl Tally {
    pub fn ready_to_play(&self) -> bool {
        self.like_count >= self.like_threshold
    }
}

#[cfg(test)]
impl RoundSelection {
    pub fn chosen(&self) -> &ParticipantData {
        match self {
            Self::Selected { chosen, .. } | Self::Failed { chosen, .. } => chosen,
        }
    }
}

impl Readiness {
    pub fn ready_to_play(&self) -> bool {
        match self {
            Self::NoTrackSelected => false,
            Self::Evaluated { tally, .. } => tally.ready_to_play(),
        }
    }
}

impl RoundEngine {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            identity: Identity::new(context),
        }
    }

    /// Picks a track on behalf of a random member and makes it the current track.
    /// Votes are left alone, so votes for a replaced track simply stop counting.
    pub async fn select_random_track(&self, code: &str) -> Result<RoundSelection, RoomError> {
        let room = self.context.room_by_code(code).await?;
        let chosen = self.draw_participant(&room).await?;

        self.pick_for(room, chosen).await
    }

    /// Starts a new round: every vote of the room is deleted, then a new track is selected.
    ///
    /// If the pick fails the votes stay deleted and the previous track remains current.
    pub async fn advance_round(&self, code: &str) -> Result<RoundSelection, RoomError> {
        let room = self.context.room_by_code(code).await?;

        let chosen = {
            let _guard = self.context.locks.lock(room.id).await;
            let chosen = self.draw_participant(&room).await?;

            let deleted = self.context.database.delete_votes(room.id).await?;
            debug!("Cleared {} votes of room {}", deleted, room.code);

            chosen
        };

        info!("Advancing round of room {}", room.code);
        self.pick_for(room, chosen).await
    }

    /// Records a like or dislike for the room's current track and returns the new tally.
    /// Voting more than once adds more votes.
    pub async fn cast_vote(
        &self,
        code: &str,
        external_id: &str,
        is_like: bool,
    ) -> Result<VoteResult, RoomError> {
        let room = self.context.room_by_code(code).await?;
        let _guard = self.context.locks.lock(room.id).await;

        // Read again under the guard, so the vote is tagged with the track current right now
        let room = self.context.database.room_by_id(room.id).await?;
        let track = room.current_track.clone().ok_or(RoomError::NoCurrentTrack)?;

        let participant = self
            .identity
            .resolve(external_id)
            .await
            .map_err(RoomError::participant)?;

        self.context
            .database
            .room_member(room.id, participant.id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => RoomError::NotAMember,
                e => RoomError::Db(e),
            })?;

        self.context
            .database
            .create_vote(NewVote {
                room_id: room.id,
                participant_id: participant.id,
                track_uri: track.uri.clone(),
                is_like,
            })
            .await?;

        let tally = self.tally(&room, &track).await?;

        debug!(
            "Participant {} voted on {} in room {} ({}/{})",
            participant.id, track.uri, room.code, tally.like_count, tally.like_threshold
        );

        Ok(VoteResult {
            room_code: room.code,
            track,
            tally,
        })
    }

    pub async fn state(&self, code: &str) -> Result<RoomState, RoomError> {
        let room = self.context.room_by_code(code).await?;

        let like_count = match &room.current_track {
            Some(track) => self.tally(&room, track).await?.like_count,
            None => 0,
        };

        Ok(RoomState { room, like_count })
    }

    /// Whether the current track has enough likes to be played
    pub async fn readiness(&self, code: &str) -> Result<Readiness, RoomError> {
        let room = self.context.room_by_code(code).await?;

        let Some(track) = room.current_track.clone() else {
            return Ok(Readiness::NoTrackSelected);
        };

        let tally = self.tally(&room, &track).await?;

        Ok(Readiness::Evaluated { track, tally })
    }

    async fn tally(&self, room: &RoomData, track: &TrackData) -> Result<Tally, RoomError> {
        let like_count = self
            .context
            .database
            .count_likes(room.id, &track.uri)
            .await?;

        Ok(Tally {
            like_count,
            like_threshold: room.like_threshold,
        })
    }

    /// Draws one member of the room uniformly at random, the host included
    async fn draw_participant(&self, room: &RoomData) -> Result<ParticipantData, RoomError> {
        let members = self.context.database.room_members(room.id).await?;

        members
            .choose(&mut rand::thread_rng())
            .map(|m| m.participant.clone())
            .ok_or(RoomError::NoParticipants)
    }

    /// Asks the track picker for a track of the chosen participant.
    /// The room is only locked for the final write, never during the pick itself.
    async fn pick_for(
        &self,
        room: RoomData,
        chosen: ParticipantData,
    ) -> Result<RoundSelection, RoomError> {
        let token = self
            .identity
            .capability_token(chosen.id)
            .await
            .map_err(RoomError::participant)?;

        let track = match self.context.picker.pick_track(&token).await {
            Ok(track) => track,
            Err(e) => {
                warn!(
                    "Could not pick a track for room {} from participant {}: {}",
                    room.code, chosen.id, e
                );

                return Ok(RoundSelection::Failed {
                    room_code: room.code,
                    chosen,
                    reason: e.reason,
                });
            }
        };

        let _guard = self.context.locks.lock(room.id).await;
        self.context
            .database
            .update_current_track(room.id, track.clone())
            .await?;

        info!(
            "Room {} is now voting on {} picked from participant {}",
            room.code, track.uri, chosen.id
        );

        Ok(RoundSelection::Selected {
            room_code: room.code,
            chosen,
            track,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::{testing::Fixture, RoomError, TrackData};

    use super::{Readiness, RoundSelection, Tally};

    fn selected_track(selection: RoundSelection) -> TrackData {
        match selection {
            RoundSelection::Selected { track, .. } => track,
            RoundSelection::Failed { reason, .. } => panic!("pick failed: {reason}"),
        }
    }

    #[test]
    fn ready_when_likes_reach_threshold() {
        for like_threshold in 1..=6 {
            for like_count in 0..=like_threshold + 2 {
                let tally = Tally {
                    like_count,
                    like_threshold,
                };

                assert_eq!(tally.ready_to_play(), like_count >= like_threshold);
            }
        }

        let edge = |like_count| Tally {
            like_count,
            like_threshold: 3,
        };

        assert!(!edge(0).ready_to_play());
        assert!(!edge(2).ready_to_play());
        assert!(edge(3).ready_to_play());
        assert!(edge(4).ready_to_play());
    }

    #[tokio::test]
    async fn likes_from_two_participants_reach_threshold() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(2, &["john"]).await;
        let rounds = &fixture.collab.rounds;

        fixture.picker.push_track("spotify:track:one");
        rounds.select_random_track(&code).await.unwrap();

        let first = rounds.cast_vote(&code, "host", true).await.unwrap();
        assert_eq!(first.tally.like_count, 1);
        assert!(!first.tally.ready_to_play());

        let second = rounds.cast_vote(&code, "john", true).await.unwrap();
        assert_eq!(second.tally.like_count, 2);
        assert_eq!(second.tally.like_threshold, 2);
        assert!(second.tally.ready_to_play());
        assert_eq!(second.track.uri, "spotify:track:one");
    }

    #[tokio::test]
    async fn dislikes_do_not_count_and_repeat_votes_do() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(3, &["john"]).await;
        let rounds = &fixture.collab.rounds;

        fixture.picker.push_track("spotify:track:one");
        rounds.select_random_track(&code).await.unwrap();

        let dislike = rounds.cast_vote(&code, "john", false).await.unwrap();
        assert_eq!(dislike.tally.like_count, 0);

        rounds.cast_vote(&code, "john", true).await.unwrap();
        let repeated = rounds.cast_vote(&code, "john", true).await.unwrap();
        assert_eq!(repeated.tally.like_count, 2);
    }

    #[tokio::test]
    async fn vote_without_current_track() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(2, &[]).await;

        let result = fixture.collab.rounds.cast_vote(&code, "host", true).await;

        assert!(matches!(result, Err(RoomError::NoCurrentTrack)));
    }

    #[tokio::test]
    async fn vote_checks_happen_in_order() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(2, &[]).await;
        fixture.participant("outsider").await;
        let rounds = &fixture.collab.rounds;

        assert!(matches!(
            rounds.cast_vote("NOPE00", "ghost", true).await,
            Err(RoomError::RoomNotFound)
        ));
        // No current track is reported before the participant is looked at
        assert!(matches!(
            rounds.cast_vote(&code, "ghost", true).await,
            Err(RoomError::NoCurrentTrack)
        ));

        fixture.picker.push_track("spotify:track:one");
        rounds.select_random_track(&code).await.unwrap();

        assert!(matches!(
            rounds.cast_vote(&code, "ghost", true).await,
            Err(RoomError::ParticipantNotFound)
        ));
        assert!(matches!(
            rounds.cast_vote(&code, "outsider", true).await,
            Err(RoomError::NotAMember)
        ));
    }

    #[tokio::test]
    async fn votes_for_a_replaced_track_stop_counting() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(5, &["john"]).await;
        let rounds = &fixture.collab.rounds;

        fixture.picker.push_track("spotify:track:x");
        rounds.select_random_track(&code).await.unwrap();
        rounds.cast_vote(&code, "host", true).await.unwrap();
        rounds.cast_vote(&code, "john", true).await.unwrap();
        assert_eq!(rounds.state(&code).await.unwrap().like_count, 2);

        fixture.picker.push_track("spotify:track:y");
        let track = selected_track(rounds.select_random_track(&code).await.unwrap());
        assert_eq!(track.uri, "spotify:track:y");

        let state = rounds.state(&code).await.unwrap();
        assert_eq!(state.like_count, 0);
        assert_eq!(state.room.current_track.unwrap().uri, "spotify:track:y");

        let vote = rounds.cast_vote(&code, "john", true).await.unwrap();
        assert_eq!(vote.tally.like_count, 1);
    }

    #[tokio::test]
    async fn select_without_participants_leaves_room_untouched() {
        let fixture = Fixture::new();
        let room = fixture.empty_room(2).await;

        let result = fixture.collab.rounds.select_random_track(&room.code).await;
        let state = fixture.collab.rounds.state(&room.code).await.unwrap();

        assert!(matches!(result, Err(RoomError::NoParticipants)));
        assert!(state.room.current_track.is_none());
        assert!(fixture.picker.tokens().is_empty());
    }

    #[tokio::test]
    async fn failed_pick_keeps_current_track() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(2, &[]).await;
        let rounds = &fixture.collab.rounds;

        fixture.picker.push_track("spotify:track:kept");
        rounds.select_random_track(&code).await.unwrap();
        rounds.cast_vote(&code, "host", true).await.unwrap();

        fixture.picker.push_error("no_playlists");
        let selection = rounds.select_random_track(&code).await.unwrap();

        match selection {
            RoundSelection::Failed { reason, chosen, .. } => {
                assert_eq!(reason, "no_playlists");
                assert_eq!(chosen.external_id, "host");
            }
            other => panic!("expected a failed pick, got {other:?}"),
        }

        let state = rounds.state(&code).await.unwrap();
        assert_eq!(state.room.current_track.unwrap().uri, "spotify:track:kept");
        assert_eq!(state.like_count, 1);
    }

    #[tokio::test]
    async fn picks_use_the_chosen_participants_token() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(2, &["john", "mary"]).await;

        for _ in 0..20 {
            fixture.picker.push_track("spotify:track:any");
            let selection = fixture.collab.rounds.select_random_track(&code).await.unwrap();
            let chosen = selection.chosen().external_id.clone();

            assert_eq!(
                fixture.picker.tokens().last().cloned(),
                Some(format!("token-{chosen}"))
            );
        }
    }

    #[tokio::test]
    async fn advance_round_resets_likes() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(1, &["john"]).await;
        let rounds = &fixture.collab.rounds;

        fixture.picker.push_track("spotify:track:first");
        rounds.select_random_track(&code).await.unwrap();
        rounds.cast_vote(&code, "host", true).await.unwrap();
        rounds.cast_vote(&code, "john", true).await.unwrap();

        // The same track may well come up again, and must still start from zero
        fixture.picker.push_track("spotify:track:first");
        let selection = rounds.advance_round(&code).await.unwrap();
        assert_eq!(selected_track(selection).uri, "spotify:track:first");

        assert_eq!(rounds.state(&code).await.unwrap().like_count, 0);
        assert!(!rounds.readiness(&code).await.unwrap().ready_to_play());
    }

    #[tokio::test]
    async fn failed_advance_clears_votes_but_keeps_track() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(2, &["john"]).await;
        let rounds = &fixture.collab.rounds;

        fixture.picker.push_track("spotify:track:stale");
        rounds.select_random_track(&code).await.unwrap();
        rounds.cast_vote(&code, "host", true).await.unwrap();
        rounds.cast_vote(&code, "john", true).await.unwrap();

        fixture.picker.push_error("rate_limited");
        let selection = rounds.advance_round(&code).await.unwrap();
        assert!(matches!(selection, RoundSelection::Failed { .. }));

        let state = rounds.state(&code).await.unwrap();
        assert_eq!(state.room.current_track.unwrap().uri, "spotify:track:stale");
        assert_eq!(state.like_count, 0);
    }

    #[tokio::test]
    async fn advance_round_requires_participants() {
        let fixture = Fixture::new();
        let room = fixture.empty_room(2).await;

        let result = fixture.collab.rounds.advance_round(&room.code).await;

        assert!(matches!(result, Err(RoomError::NoParticipants)));
    }

    #[tokio::test]
    async fn readiness_without_track() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(1, &[]).await;

        let readiness = fixture.collab.rounds.readiness(&code).await.unwrap();

        assert!(matches!(readiness, Readiness::NoTrackSelected));
        assert!(!readiness.ready_to_play());
    }

    #[tokio::test]
    async fn readiness_follows_votes() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(1, &[]).await;
        let rounds = &fixture.collab.rounds;

        fixture.picker.push_track("spotify:track:one");
        rounds.select_random_track(&code).await.unwrap();
        assert!(!rounds.readiness(&code).await.unwrap().ready_to_play());

        rounds.cast_vote(&code, "host", true).await.unwrap();

        match rounds.readiness(&code).await.unwrap() {
            Readiness::Evaluated { track, tally } => {
                assert_eq!(track.uri, "spotify:track:one");
                assert_eq!(tally.like_count, 1);
                assert!(tally.ready_to_play());
            }
            Readiness::NoTrackSelected => panic!("track was selected"),
        }
    }

    #[tokio::test]
    async fn votes_are_not_blocked_by_a_pick_in_flight() {
        let fixture = Fixture::new();
        let code = fixture.room_with_members(3, &[]).await;
        let rounds = &fixture.collab.rounds;

        fixture.picker.push_track("spotify:track:a");
        rounds.select_random_track(&code).await.unwrap();

        fixture.picker.push_track("spotify:track:b");
        let gate = fixture.picker.hold();

        let select = rounds.select_random_track(&code);
        let vote = async {
            let result = rounds.cast_vote(&code, "host", true).await;
            gate.notify_one();
            result
        };

        let (selection, vote) = timeout(Duration::from_secs(1), async { tokio::join!(select, vote) })
            .await
            .expect("vote completes while the pick is pending");

        assert_eq!(vote.unwrap().track.uri, "spotify:track:a");
        assert_eq!(selected_track(selection.unwrap()).uri, "spotify:track:b");
        assert_eq!(rounds.state(&code).await.unwrap().like_count, 0);
    }
}
