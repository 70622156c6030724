//! Persisted room rows.
//!
//! The registry writes a `RoomRecord` after every committed mutation and
//! deletes it when the room closes. Storage itself sits behind
//! `RoomRepository`; `InMemoryRoomRepository` is the default backend.

use crate::session::SessionState;
use crate::types::RoomNumber;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Schema version for record compatibility
/// Version 1: initial layout
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// One row per room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub schema_version: u32,
    /// Save timestamp (RFC 3339)
    pub exported_at: String,
    pub state: SessionState,
}

impl RoomRecord {
    pub fn new(state: SessionState) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            state,
        }
    }

    pub fn room_number(&self) -> RoomNumber {
        self.state.room_number
    }

    /// Reject records written by a newer server
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.schema_version > RECORD_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: self.schema_version,
                supported: RECORD_SCHEMA_VERSION,
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("Storage backend failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn save(&self, record: RoomRecord) -> Result<(), StoreError>;

    async fn load(&self, room: RoomNumber) -> Result<Option<RoomRecord>, StoreError>;

    async fn delete(&self, room: RoomNumber) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<RoomRecord>, StoreError>;
}

/// Process-local storage. Saves may land out of order because they run
/// outside the room lock, so an older version never replaces a newer one.
#[derive(Default)]
pub struct InMemoryRoomRepository {
    rows: RwLock<BTreeMap<RoomNumber, RoomRecord>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn save(&self, record: RoomRecord) -> Result<(), StoreError> {
        record.validate()?;
        let mut rows = self.rows.write().await;
        let stale = rows
            .get(&record.room_number())
            .is_some_and(|existing| existing.state.version > record.state.version);
        if stale {
            tracing::debug!(
                room = record.room_number(),
                "Skipping stale save of version {}",
                record.state.version
            );
            return Ok(());
        }
        rows.insert(record.room_number(), record);
        Ok(())
    }

    async fn load(&self, room: RoomNumber) -> Result<Option<RoomRecord>, StoreError> {
        Ok(self.rows.read().await.get(&room).cloned())
    }

    async fn delete(&self, room: RoomNumber) -> Result<(), StoreError> {
        self.rows.write().await.remove(&room);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RoomRecord>, StoreError> {
        Ok(self.rows.read().await.values().cloned().collect())
    }
}
