//! Room arena keyed by room number.
//!
//! Each room owns its own `tokio::sync::Mutex<GameSession>`, so rooms never
//! contend with each other. The last committed state is also published on a
//! `watch` channel, which lets reads skip the room lock entirely.
//! Broadcast and persistence run after the lock is released.
//!
//! Rooms end when their last member leaves, or when the sweeper finds them
//! idle (see `spawn_room_sweeper`).

use crate::broadcast::{ChannelBroadcaster, SnapshotBroadcaster};
use crate::config::{GameRules, RoomCleanup};
use crate::content::ContentPool;
use crate::error::{GameError, GameResult};
use crate::session::snapshot::{self, GameSnapshot};
use crate::session::{GameSession, PhaseToken, SessionState};
use crate::store::{InMemoryRoomRepository, RoomRecord, RoomRepository, StoreError};
use crate::types::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Highest room number handed out
pub const MAX_ROOM_NUMBER: RoomNumber = 999;

struct Room {
    session: Mutex<GameSession>,
    published: watch::Sender<Arc<SessionState>>,
    /// Time of the last committed change; written under the session lock
    touched: Mutex<Instant>,
}

impl Room {
    fn new(session: GameSession) -> Self {
        let (published, _) = watch::channel(Arc::new(session.state().clone()));
        Self {
            session: Mutex::new(session),
            published,
            touched: Mutex::new(Instant::now()),
        }
    }

    /// Last committed state, without taking the room lock
    fn current(&self) -> Arc<SessionState> {
        self.published.borrow().clone()
    }
}

/// Lobby listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room_number: RoomNumber,
    pub name: String,
    pub phase: GamePhase,
    pub players: usize,
    pub max_participants: usize,
    pub owner_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessOutcome {
    pub is_correct: bool,
    pub snapshot: GameSnapshot,
}

#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<RoomNumber, Arc<Room>>>>,
    rules: Arc<GameRules>,
    content: Arc<dyn ContentPool>,
    broadcaster: Arc<dyn SnapshotBroadcaster>,
    repository: Arc<dyn RoomRepository>,
}

impl RoomRegistry {
    pub fn new(
        rules: GameRules,
        content: Arc<dyn ContentPool>,
        broadcaster: Arc<dyn SnapshotBroadcaster>,
        repository: Arc<dyn RoomRepository>,
    ) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            rules: Arc::new(rules),
            content,
            broadcaster,
            repository,
        }
    }

    /// Channel broadcaster and in-memory storage
    pub fn in_memory(rules: GameRules, content: Arc<dyn ContentPool>) -> Self {
        Self::new(
            rules,
            content,
            Arc::new(ChannelBroadcaster::new()),
            Arc::new(InMemoryRoomRepository::new()),
        )
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    async fn room(&self, number: RoomNumber) -> GameResult<Arc<Room>> {
        self.rooms
            .read()
            .await
            .get(&number)
            .cloned()
            .ok_or(GameError::RoomNotFound(number))
    }

    /// Run one operation under the room lock. On success the new state is
    /// published, a timer is armed if a new phase instance began, and the
    /// state is broadcast and saved once the lock is released.
    async fn mutate<T>(
        &self,
        number: RoomNumber,
        op: impl FnOnce(&mut GameSession) -> GameResult<T>,
    ) -> GameResult<(T, Arc<SessionState>)> {
        let room = self.room(number).await?;

        let (value, state, changed, timer) = {
            let mut session = room.session.lock().await;
            let version = session.state().version;
            let seq = session.state().seq;

            let value = op(&mut *session)?;

            let state = Arc::new(session.state().clone());
            let changed = state.version != version;
            let timer = if state.seq != seq {
                session.pending_timeout()
            } else {
                None
            };
            if changed {
                room.published.send_replace(state.clone());
                *room.touched.lock().await = Instant::now();
            }
            (value, state, changed, timer)
        };

        if let Some((token, after)) = timer {
            self.arm_timer(number, token, after);
        }
        if changed {
            self.after_commit(state.clone()).await;
        }
        Ok((value, state))
    }

    /// Mutate, then project the result for the acting player
    async fn act(
        &self,
        number: RoomNumber,
        actor_id: &str,
        op: impl FnOnce(&mut GameSession) -> GameResult<()>,
    ) -> GameResult<GameSnapshot> {
        let ((), state) = self.mutate(number, op).await?;
        Ok(snapshot::project(&state, Some(actor_id)))
    }

    async fn after_commit(&self, state: Arc<SessionState>) {
        let number = state.room_number;
        self.broadcaster.publish(number, state.clone()).await;
        if let Err(e) = self.repository.save(RoomRecord::new((*state).clone())).await {
            tracing::warn!(room = number, "Failed to save room: {}", e);
        }
    }

    fn arm_timer(&self, number: RoomNumber, token: PhaseToken, after: Duration) {
        tracing::debug!(room = number, "Timer armed for {:?} in {:?}", token, after);
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            registry.fire_timeout(number, token).await;
        });
    }

    async fn fire_timeout(&self, number: RoomNumber, token: PhaseToken) {
        let result = self
            .mutate(number, |session| Ok(session.on_timeout(token)))
            .await;
        if let Err(e) = result {
            tracing::debug!(room = number, "Timer dropped: {}", e);
        }
    }

    /// Reload every persisted room and re-arm its phase timer
    pub async fn restore(&self) -> Result<usize, StoreError> {
        let mut restored = 0;
        for record in self.repository.list().await? {
            if let Err(e) = record.validate() {
                tracing::warn!(room = record.room_number(), "Skipping room: {}", e);
                continue;
            }
            let number = record.room_number();
            let session = GameSession::restore(record.state, (*self.rules).clone());
            let timer = session.pending_timeout();
            self.rooms
                .write()
                .await
                .insert(number, Arc::new(Room::new(session)));
            if let Some((token, after)) = timer {
                self.arm_timer(number, token, after);
            }
            restored += 1;
        }
        tracing::info!("Restored {} room(s)", restored);
        Ok(restored)
    }

    // ---- room lifecycle ----

    /// Open a room under the lowest free number with `owner` as first member
    pub async fn create_room(
        &self,
        owner: &Actor,
        settings: RoomSettings,
    ) -> GameResult<GameSnapshot> {
        let room = {
            let mut rooms = self.rooms.write().await;
            let number = (1..=MAX_ROOM_NUMBER)
                .find(|n| !rooms.contains_key(n))
                .ok_or(GameError::RoomNumbersExhausted)?;
            let session = GameSession::create(
                number,
                owner,
                settings,
                (*self.rules).clone(),
                self.content.as_ref(),
            )?;
            let room = Arc::new(Room::new(session));
            rooms.insert(number, room.clone());
            room
        };

        let state = room.current();
        self.after_commit(state.clone()).await;
        Ok(snapshot::project(&state, Some(&owner.id)))
    }

    pub async fn join(&self, number: RoomNumber, actor: &Actor) -> GameResult<GameSnapshot> {
        self.act(number, &actor.id, |s| s.join(actor)).await
    }

    /// Leave a room; the room closes once its last member is gone
    pub async fn leave(&self, number: RoomNumber, actor_id: &str) -> GameResult<()> {
        let ((), state) = self.mutate(number, |s| s.leave(actor_id)).await?;
        if state.players.is_empty() {
            self.close_if_empty(number).await;
        }
        Ok(())
    }

    async fn close_if_empty(&self, number: RoomNumber) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(&number).cloned() else {
            return;
        };
        // Somebody may have joined since the last member left
        if !room.session.lock().await.is_empty() {
            return;
        }
        rooms.remove(&number);
        drop(rooms);

        self.release(number).await;
        tracing::info!(room = number, "Room closed");
    }

    /// Tear down what outlives the arena entry
    async fn release(&self, number: RoomNumber) {
        self.broadcaster.close(number).await;
        if let Err(e) = self.repository.delete(number).await {
            tracing::warn!(room = number, "Failed to delete room: {}", e);
        }
    }

    /// Close every room that has gone without a commit for longer than
    /// `policy` allows. Returns the closed room numbers.
    pub async fn sweep_idle_rooms(&self, policy: &RoomCleanup) -> Vec<RoomNumber> {
        let now = Instant::now();
        let mut closed = Vec::new();
        {
            let mut rooms = self.rooms.write().await;
            for (number, room) in rooms.iter() {
                // A room in the middle of an operation is not idle
                let Ok(_session) = room.session.try_lock() else {
                    continue;
                };
                let limit = if room.current().phase == GamePhase::Ended {
                    policy.ended_after
                } else {
                    policy.idle_after
                };
                let idle = now.saturating_duration_since(*room.touched.lock().await);
                if limit.is_some_and(|limit| idle >= limit) {
                    closed.push(*number);
                }
            }
            closed.sort_unstable();
            for number in &closed {
                rooms.remove(number);
            }
        }

        for number in &closed {
            self.release(*number).await;
            tracing::info!(room = *number, "Idle room closed");
        }
        closed
    }

    // ---- game actions ----

    pub async fn start(&self, number: RoomNumber, actor_id: &str) -> GameResult<GameSnapshot> {
        let content = self.content.clone();
        self.act(number, actor_id, |s| s.start(actor_id, content.as_ref()))
            .await
    }

    pub async fn give_hint(
        &self,
        number: RoomNumber,
        actor_id: &str,
        text: &str,
    ) -> GameResult<GameSnapshot> {
        self.act(number, actor_id, |s| s.give_hint(actor_id, text))
            .await
    }

    pub async fn vote(
        &self,
        number: RoomNumber,
        actor_id: &str,
        target_id: &str,
    ) -> GameResult<GameSnapshot> {
        self.act(number, actor_id, |s| s.vote(actor_id, target_id))
            .await
    }

    pub async fn submit_defense(
        &self,
        number: RoomNumber,
        actor_id: &str,
        text: &str,
    ) -> GameResult<GameSnapshot> {
        self.act(number, actor_id, |s| s.submit_defense(actor_id, text))
            .await
    }

    pub async fn end_defense(
        &self,
        number: RoomNumber,
        actor_id: &str,
    ) -> GameResult<GameSnapshot> {
        self.act(number, actor_id, |s| s.end_defense(actor_id)).await
    }

    pub async fn final_vote(
        &self,
        number: RoomNumber,
        actor_id: &str,
        eliminate: bool,
    ) -> GameResult<GameSnapshot> {
        self.act(number, actor_id, |s| s.final_vote(actor_id, eliminate))
            .await
    }

    pub async fn guess_word(
        &self,
        number: RoomNumber,
        actor_id: &str,
        guess: &str,
    ) -> GameResult<GuessOutcome> {
        let (is_correct, state) = self
            .mutate(number, |s| s.guess_word(actor_id, guess))
            .await?;
        Ok(GuessOutcome {
            is_correct,
            snapshot: snapshot::project(&state, Some(actor_id)),
        })
    }

    // ---- reads ----

    /// Last committed state of a room
    pub async fn state(&self, number: RoomNumber) -> GameResult<Arc<SessionState>> {
        Ok(self.room(number).await?.current())
    }

    /// Role-scoped snapshot; served from the published state, not the lock
    pub async fn game_state(
        &self,
        number: RoomNumber,
        actor_id: Option<&str>,
    ) -> GameResult<GameSnapshot> {
        let state = self.state(number).await?;
        Ok(snapshot::project(&state, actor_id))
    }

    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        let mut summaries: Vec<RoomSummary> = rooms
            .iter()
            .map(|room| {
                let state = room.current();
                RoomSummary {
                    room_number: state.room_number,
                    name: state.settings.name.clone(),
                    phase: state.phase,
                    players: state.players.len(),
                    max_participants: state.settings.max_participants,
                    owner_id: state.owner_id.clone(),
                }
            })
            .collect();
        summaries.sort_by_key(|s| s.room_number);
        summaries
    }

    /// Full persisted row, hidden roles included. Refused while a game is
    /// running, since roles and the word are secret until it ends.
    pub async fn export(&self, number: RoomNumber) -> GameResult<RoomRecord> {
        let state = self.state(number).await?;
        if state.phase.is_in_progress() {
            return Err(GameError::WrongPhase(state.phase));
        }
        Ok(RoomRecord::new((*state).clone()))
    }

    pub async fn subscribe(
        &self,
        number: RoomNumber,
    ) -> GameResult<broadcast::Receiver<Arc<SessionState>>> {
        // Fail for unknown rooms instead of opening an orphan topic
        self.room(number).await?;
        Ok(self.broadcaster.subscribe(number).await)
    }
}

/// Periodically close idle rooms so abandoned games do not pin their
/// room numbers forever
pub fn spawn_room_sweeper(registry: RoomRegistry, policy: RoomCleanup) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(policy.interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let closed = registry.sweep_idle_rooms(&policy).await;
            if !closed.is_empty() {
                tracing::info!("Swept {} idle room(s): {:?}", closed.len(), closed);
            }
        }
    })
}
