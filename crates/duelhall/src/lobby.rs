//! The lobby: every room operation an adapter can call, plus the clocks
//! that act on rooms when nobody is calling.
//!
//! ```text
//! adapter ──→ Lobby ──→ RoomDirectory ──→ RoomHandle ──→ room actor
//!               │                                           │
//!               ├── DeferredTimers (empty rooms, grace) ────┤
//!               ├── turn clock (TickScheduler) ─────────────┘
//!               └── PushSink ←── RoomView (snapshot + profiles)
//! ```
//!
//! Views are assembled after the room actor replies, so resolving player
//! profiles never holds up other commands for the same room.

use std::sync::{Arc, Weak};
use std::time::Duration;

use duelhall_protocol::{ChatMessage, GameInfo, GameMove, GameType, RoomId, UserId};
use duelhall_room::{RoomConfig, RoomDirectory, RoomFilter, RoomSettings, RoomSnapshot};
use duelhall_scheduler::{DeferredTimers, TickScheduler};
use duelhall_session::UserLookup;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{LobbyError, PushSink, RoomView};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LobbyConfig {
    pub room: RoomConfig,
    /// How long an empty room survives before it is deleted.
    pub empty_room_ttl: Duration,
    /// Turn-deadline polling rate. 0 disables the turn clock.
    pub turn_poll_hz: u32,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            room: RoomConfig::default(),
            empty_room_ttl: Duration::from_secs(30),
            turn_poll_hz: 1,
        }
    }
}

/// Builder for a [`Lobby`].
///
/// ```rust,ignore
/// let lobby = LobbyBuilder::new()
///     .empty_room_ttl(Duration::from_secs(60))
///     .build(registry, RoomHub::default());
/// let clock = lobby.spawn_turn_clock();
/// ```
#[derive(Debug, Default)]
pub struct LobbyBuilder {
    config: LobbyConfig,
}

impl LobbyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    pub fn empty_room_ttl(mut self, ttl: Duration) -> Self {
        self.config.empty_room_ttl = ttl;
        self
    }

    pub fn turn_poll_hz(mut self, hz: u32) -> Self {
        self.config.turn_poll_hz = hz;
        self
    }

    pub fn build<U: UserLookup, P: PushSink>(self, users: U, push: P) -> Lobby<U, P> {
        let (stop, _) = watch::channel(false);
        Lobby {
            inner: Arc::new(Shared {
                directory: RoomDirectory::new(self.config.room.clone()),
                timers: DeferredTimers::new(),
                users,
                push,
                stop,
                config: self.config,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Keys of the lobby's deferred actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Deletes the room if it is still empty.
    EmptyRoom(RoomId),
    /// Resolves the user's disconnect grace.
    Disconnect(RoomId, UserId),
}

impl TimerKey {
    pub fn room_id(&self) -> RoomId {
        match *self {
            Self::EmptyRoom(room_id) | Self::Disconnect(room_id, _) => room_id,
        }
    }
}

/// A timer as armed: the key plus the room's membership epoch at the
/// time the room asked for it. A join cancels only what was armed at or
/// before its own epoch, so a late cancel never removes a timer for a
/// newer leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Armed {
    key: TimerKey,
    epoch: u64,
}

/// What leaving a room produced.
#[derive(Debug, Clone)]
pub enum LeaveResult {
    Room(RoomView),
    /// The room is empty and will be deleted after `ttl` unless someone
    /// joins first.
    ScheduledDeletion { room_id: RoomId, ttl: Duration },
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

struct Shared<U, P> {
    directory: RoomDirectory,
    timers: DeferredTimers<Armed>,
    users: U,
    push: P,
    /// Flipped to `true` on shutdown; the turn clock watches it.
    stop: watch::Sender<bool>,
    config: LobbyConfig,
}

/// Entry point for adapters. Cheap to clone; clones share all state.
pub struct Lobby<U, P> {
    inner: Arc<Shared<U, P>>,
}

impl<U: UserLookup, P: PushSink> Clone for Lobby<U, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U: UserLookup, P: PushSink> Lobby<U, P> {
    pub fn config(&self) -> &LobbyConfig {
        &self.inner.config
    }

    pub fn users(&self) -> &U {
        &self.inner.users
    }

    pub fn push(&self) -> &P {
        &self.inner.push
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.inner.directory.len()
    }

    /// Whether a deferred action is pending under `key`.
    pub fn timer_armed(&self, key: TimerKey) -> bool {
        self.inner.timers.any_armed(|armed| armed.key == key)
    }

    pub fn game_catalog(&self) -> Vec<GameInfo> {
        GameType::ALL.into_iter().map(GameType::info).collect()
    }

    // -- rooms ------------------------------------------------------------

    /// Creates a room with `host` seated.
    pub async fn create_room(
        &self,
        host: UserId,
        name: &str,
        game_type: GameType,
        private: bool,
    ) -> Result<RoomView, LobbyError> {
        self.inner.users.find(host)?;
        let handle = self
            .inner
            .directory
            .create_room(host, name, game_type, private)?;
        let snapshot = handle.snapshot().await?;
        self.publish(snapshot)
    }

    pub async fn room(&self, room_id: RoomId) -> Result<RoomView, LobbyError> {
        let snapshot = self.inner.directory.get(room_id)?.snapshot().await?;
        self.view(snapshot)
    }

    /// Rooms oldest first, optionally only one game type.
    pub async fn list_rooms(&self, game_type: Option<GameType>) -> Result<Vec<RoomView>, LobbyError> {
        self.inner
            .directory
            .list(RoomFilter { game_type })
            .await
            .into_iter()
            .map(|snapshot| self.view(snapshot))
            .collect()
    }

    /// Seats `user`, or brings them back from disconnect grace. Cancels
    /// the room's pending deletion.
    pub async fn join_room(
        &self,
        user: UserId,
        room_id: RoomId,
        invite_code: Option<String>,
    ) -> Result<RoomView, LobbyError> {
        self.inner.users.find(user)?;
        let handle = self.inner.directory.get(room_id)?;
        let snapshot = handle.join(user, invite_code).await?;

        let epoch = snapshot.membership_epoch;
        let deletion = TimerKey::EmptyRoom(room_id);
        let grace = TimerKey::Disconnect(room_id, user);
        self.inner.timers.cancel_matching(|armed| {
            armed.epoch <= epoch && (armed.key == deletion || armed.key == grace)
        });
        self.publish(snapshot)
    }

    /// Leaves a room. Mid-game the seat is held for the disconnect grace;
    /// a room left empty is scheduled for deletion.
    pub async fn leave_room(&self, user: UserId, room_id: RoomId) -> Result<LeaveResult, LobbyError> {
        let handle = self.inner.directory.get(room_id)?;
        let outcome = handle.leave(user).await?;

        let epoch = outcome.membership_epoch;
        if let Some(until) = outcome.grace_until {
            self.arm_disconnect(room_id, user, epoch, until);
        }

        if outcome.now_empty {
            let ttl = self.inner.config.empty_room_ttl;
            self.arm_empty_room(room_id, epoch);
            return Ok(LeaveResult::ScheduledDeletion { room_id, ttl });
        }
        self.publish(outcome.snapshot).map(LeaveResult::Room)
    }

    /// Host-only.
    pub async fn start_game(&self, user: UserId, room_id: RoomId) -> Result<RoomView, LobbyError> {
        let snapshot = self.inner.directory.get(room_id)?.start(user).await?;
        self.publish(snapshot)
    }

    pub async fn submit_move(
        &self,
        user: UserId,
        room_id: RoomId,
        mv: GameMove,
    ) -> Result<RoomView, LobbyError> {
        let snapshot = self
            .inner
            .directory
            .get(room_id)?
            .submit_move(user, mv)
            .await?;
        self.publish(snapshot)
    }

    /// Host-only; the game must be finished.
    pub async fn restart_game(&self, user: UserId, room_id: RoomId) -> Result<RoomView, LobbyError> {
        let snapshot = self.inner.directory.get(room_id)?.restart(user).await?;
        self.publish(snapshot)
    }

    /// Host-only.
    pub async fn update_settings(
        &self,
        user: UserId,
        room_id: RoomId,
        settings: RoomSettings,
    ) -> Result<RoomView, LobbyError> {
        let snapshot = self
            .inner
            .directory
            .get(room_id)?
            .update_settings(user, settings)
            .await?;
        self.publish(snapshot)
    }

    /// Host-only. Deletes the room at once and drops its pending timers.
    pub async fn delete_room(&self, user: UserId, room_id: RoomId) -> Result<(), LobbyError> {
        self.inner.directory.get(room_id)?.close(user).await?;
        self.forget_room(room_id);
        Ok(())
    }

    // -- chat -------------------------------------------------------------

    pub async fn send_chat(
        &self,
        user: UserId,
        room_id: RoomId,
        content: &str,
    ) -> Result<ChatMessage, LobbyError> {
        let message = self
            .inner
            .directory
            .get(room_id)?
            .post_chat(user, content.to_string())
            .await?;
        self.inner.push.notify_chat_message(room_id, &message);
        Ok(message)
    }

    /// Messages with an id greater than `after`, oldest first.
    pub async fn chat_history(
        &self,
        user: UserId,
        room_id: RoomId,
        after: u64,
    ) -> Result<Vec<ChatMessage>, LobbyError> {
        Ok(self
            .inner
            .directory
            .get(room_id)?
            .chat_since(user, after)
            .await?)
    }

    // -- clocks -----------------------------------------------------------

    /// Checks every room's turn deadline once. Returns how many games
    /// were forfeited.
    pub async fn poll_turn_timeouts(&self) -> usize {
        let mut forfeited = 0;
        for handle in self.inner.directory.handles() {
            match handle.check_turn_timeout().await {
                Ok(Some(snapshot)) => {
                    forfeited += 1;
                    self.publish_quietly(snapshot);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(room_id = %handle.room_id(), %err, "turn poll skipped room");
                }
            }
        }
        forfeited
    }

    /// Runs [`poll_turn_timeouts`](Self::poll_turn_timeouts) on the
    /// configured rate until [`shutdown`](Self::shutdown) or until every
    /// clone of the lobby is dropped.
    pub fn spawn_turn_clock(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let mut stop = self.inner.stop.subscribe();
        let rate = self.inner.config.turn_poll_hz;

        tokio::spawn(async move {
            let mut clock = TickScheduler::with_rate(rate);
            tracing::info!(rate_hz = rate, "turn clock started");
            while !*stop.borrow() {
                tokio::select! {
                    changed = stop.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = clock.wait_for_tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        Lobby { inner }.poll_turn_timeouts().await;
                    }
                }
            }
            tracing::info!("turn clock stopped");
        })
    }

    /// Stops the turn clock, drops every pending timer, and stops every
    /// room.
    pub async fn shutdown(&self) {
        self.inner.stop.send_replace(true);
        self.inner.timers.cancel_all();
        self.inner.directory.shutdown_all().await;
        tracing::info!("lobby shut down");
    }

    // -- deferred actions -------------------------------------------------

    fn arm_disconnect(&self, room_id: RoomId, user: UserId, epoch: u64, until: Instant) {
        let weak = Arc::downgrade(&self.inner);
        let key = Armed {
            key: TimerKey::Disconnect(room_id, user),
            epoch,
        };
        let delay = until.saturating_duration_since(Instant::now());
        self.inner.timers.arm(key, delay, async move {
            if let Some(lobby) = Self::upgrade(&weak) {
                lobby.resolve_disconnect(room_id, user).await;
            }
        });
    }

    fn arm_empty_room(&self, room_id: RoomId, epoch: u64) {
        let weak = Arc::downgrade(&self.inner);
        let ttl = self.inner.config.empty_room_ttl;
        let key = Armed {
            key: TimerKey::EmptyRoom(room_id),
            epoch,
        };
        let armed = self.inner.timers.arm(key, ttl, async move {
            if let Some(lobby) = Self::upgrade(&weak) {
                lobby.close_empty_room(room_id, epoch).await;
            }
        });
        if armed {
            tracing::info!(%room_id, ttl_secs = ttl.as_secs(), "empty room scheduled for deletion");
        }
    }

    async fn resolve_disconnect(&self, room_id: RoomId, user: UserId) {
        let Ok(handle) = self.inner.directory.get(room_id) else {
            tracing::debug!(%room_id, user_id = %user, "grace expired for a deleted room");
            return;
        };
        let outcome = match handle.timeout_disconnected(user).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(%room_id, %err, "grace check skipped");
                return;
            }
        };

        let epoch = outcome.membership_epoch;
        if let Some(snapshot) = outcome.snapshot {
            // The reset cleared every grace entry in the room.
            self.inner.timers.cancel_matching(|armed| {
                armed.epoch <= epoch
                    && matches!(armed.key, TimerKey::Disconnect(room, _) if room == room_id)
            });
            if outcome.now_empty {
                self.arm_empty_room(room_id, epoch);
            } else {
                self.publish_quietly(snapshot);
            }
        } else if let Some(until) = outcome.grace_until {
            // Fired early for a grace that began later; wait out the rest.
            self.arm_disconnect(room_id, user, epoch, until);
        }
    }

    async fn close_empty_room(&self, room_id: RoomId, epoch: u64) {
        let Ok(handle) = self.inner.directory.get(room_id) else {
            return;
        };
        match handle.close_if_empty(epoch).await {
            Ok(true) => self.forget_room(room_id),
            Ok(false) => tracing::debug!(%room_id, "room repopulated before deletion"),
            Err(err) => tracing::debug!(%room_id, %err, "room already gone"),
        }
    }

    fn forget_room(&self, room_id: RoomId) {
        self.inner.directory.remove(room_id);
        self.inner
            .timers
            .cancel_matching(|armed| armed.key.room_id() == room_id);
        self.inner.push.room_closed(room_id);
    }

    fn upgrade(weak: &Weak<Shared<U, P>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // -- views ------------------------------------------------------------

    fn view(&self, room: RoomSnapshot) -> Result<RoomView, LobbyError> {
        let players = room
            .player_ids
            .iter()
            .map(|&id| self.inner.users.find(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RoomView { room, players })
    }

    fn publish(&self, snapshot: RoomSnapshot) -> Result<RoomView, LobbyError> {
        let view = self.view(snapshot)?;
        self.inner.push.notify_room_changed(&view);
        Ok(view)
    }

    /// For changes nobody is waiting on.
    fn publish_quietly(&self, snapshot: RoomSnapshot) {
        let room_id = snapshot.id;
        if let Err(err) = self.publish(snapshot) {
            tracing::warn!(%room_id, %err, "could not publish room update");
        }
    }
}
