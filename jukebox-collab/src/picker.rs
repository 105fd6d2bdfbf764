use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::TrackData;

pub type ArcedTrackPicker = Arc<dyn TrackPicker>;

/// The reason a track could not be picked, as reported by the collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct PickError {
    pub reason: String,
}

impl PickError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Represents a type that can pick a track from a participant's library
#[async_trait]
pub trait TrackPicker: Send + Sync {
    /// Picks one candidate track using the participant's capability token
    async fn pick_track(&self, token: &str) -> Result<TrackData, PickError>;
}
