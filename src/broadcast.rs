//! Fan-out of committed room state to connected clients.
//!
//! Subscribers receive the full `SessionState` and project it for their own
//! player, so one publish serves every role.

use crate::session::SessionState;
use crate::types::RoomNumber;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Buffered states per room before slow receivers start lagging
const TOPIC_CAPACITY: usize = 64;

/// Receives every committed state of every room
#[async_trait]
pub trait SnapshotBroadcaster: Send + Sync {
    /// Deliver a committed state to the room's subscribers
    async fn publish(&self, room: RoomNumber, state: Arc<SessionState>);

    /// Open (or join) the room's topic
    async fn subscribe(&self, room: RoomNumber) -> broadcast::Receiver<Arc<SessionState>>;

    /// Drop the room's topic; open receivers see the channel close
    async fn close(&self, room: RoomNumber);
}

/// One `tokio::sync::broadcast` topic per room
#[derive(Default)]
pub struct ChannelBroadcaster {
    topics: RwLock<HashMap<RoomNumber, broadcast::Sender<Arc<SessionState>>>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }
}

#[async_trait]
impl SnapshotBroadcaster for ChannelBroadcaster {
    async fn publish(&self, room: RoomNumber, state: Arc<SessionState>) {
        let topics = self.topics.read().await;
        if let Some(tx) = topics.get(&room) {
            // No receivers connected is fine
            let _ = tx.send(state);
        }
    }

    async fn subscribe(&self, room: RoomNumber) -> broadcast::Receiver<Arc<SessionState>> {
        let mut topics = self.topics.write().await;
        topics
            .entry(room)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    async fn close(&self, room: RoomNumber) {
        if self.topics.write().await.remove(&room).is_some() {
            tracing::debug!(room, "Broadcast topic closed");
        }
    }
}
