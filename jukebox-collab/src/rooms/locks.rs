use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::PrimaryKey;

/// Per-room mutual exclusion for read-modify-write operations.
/// Rooms never contend with each other.
#[derive(Debug, Default, Clone)]
pub struct RoomLocks {
    locks: Arc<DashMap<PrimaryKey, Arc<Mutex<()>>>>,
}

pub type RoomGuard = OwnedMutexGuard<()>;

impl RoomLocks {
    /// Waits for exclusive access to the room. Access is released when the guard is dropped.
    pub async fn lock(&self, room_id: PrimaryKey) -> RoomGuard {
        // The map entry must not be held across the await below
        let lock = self.locks.entry(room_id).or_default().clone();

        lock.lock_owned().await
    }
}
