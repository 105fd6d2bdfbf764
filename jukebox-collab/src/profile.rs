use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub type ArcedProfileLookup = Arc<dyn ProfileLookup>;

/// The account a capability token belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub external_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// The reason a token could not be resolved to an account
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct ProfileError {
    pub reason: String,
}

impl ProfileError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Represents a type that can tell who a capability token was issued to
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn current_profile(&self, token: &str) -> Result<Profile, ProfileError>;
}
