//! The room aggregate: seats, host, invite gating, the live game session,
//! and the clocks that can end it.
//!
//! [`Room`] is plain data with synchronous methods that take the current
//! instant as an argument. It has no locking of its own; the room actor
//! (see `actor.rs`) owns one `Room` and applies commands to it one at a
//! time, which is what serializes access. Keeping time a parameter makes
//! every transition here testable without a runtime.

use std::collections::{HashMap, VecDeque};
use std::time::SystemTime;

use duelhall_protocol::{
    ChatMessage, GameMove, GameType, RoomId, UserId, epoch_millis,
};
use duelhall_rules::{GameSession, GameSnapshot, GameStatus};
use rand::Rng;
use serde::Serialize;
use tokio::time::Instant;

use crate::{RoomConfig, RoomError, RoomPhase, SEATS};

/// Characters invite codes are drawn from: no 0/O, 1/I/L.
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const INVITE_LENGTH: usize = 6;
const MAX_CHAT_CHARS: usize = 500;

/// Host-editable room settings. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct RoomSettings {
    pub name: Option<String>,
    pub game_type: Option<GameType>,
    pub private: Option<bool>,
}

/// A point-in-time copy of a room, ready to serialize.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub name: String,
    pub game_type: GameType,
    pub game_type_name: String,
    pub host_user_id: UserId,
    pub private: bool,
    pub invite_code: Option<String>,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub turn_deadline_ms: Option<u64>,
    /// Seating order.
    pub player_ids: Vec<UserId>,
    /// Seated players currently inside their disconnect grace.
    pub disconnected_ids: Vec<UserId>,
    pub started: bool,
    pub status: RoomPhase,
    pub current_player_id: Option<UserId>,
    pub game: Option<GameSnapshot>,
    /// See [`Room::membership_epoch`].
    #[serde(skip)]
    pub membership_epoch: u64,
}

/// One room and everything it owns.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    game_type: GameType,
    host: UserId,
    private: bool,
    invite_code: Option<String>,
    created_at: SystemTime,
    /// Members in seating order, at most [`SEATS`].
    seats: Vec<UserId>,
    /// Present exactly while the room is started.
    game: Option<GameSession>,
    /// Seated users who left mid-game, with the instant their seat lapses.
    grace: HashMap<UserId, Instant>,
    /// Bumped on every change to `seats` or `grace`.
    membership_epoch: u64,
    turn_deadline: Option<Instant>,
    chat: VecDeque<ChatMessage>,
    next_chat_id: u64,
    config: RoomConfig,
}

impl Room {
    /// A waiting room with `host` in the first seat. Private rooms get a
    /// fresh invite code.
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        game_type: GameType,
        host: UserId,
        private: bool,
        config: RoomConfig,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            game_type,
            host,
            private,
            invite_code: private.then(generate_invite_code),
            created_at: SystemTime::now(),
            seats: vec![host],
            game: None,
            grace: HashMap::new(),
            membership_epoch: 0,
            turn_deadline: None,
            chat: VecDeque::new(),
            next_chat_id: 1,
            config,
        }
    }

    // -- accessors --------------------------------------------------------

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn host(&self) -> UserId {
        self.host
    }

    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    pub fn invite_code(&self) -> Option<&str> {
        self.invite_code.as_deref()
    }

    pub fn members(&self) -> &[UserId] {
        &self.seats
    }

    pub fn member_count(&self) -> usize {
        self.seats.len()
    }

    pub fn is_member(&self, user: UserId) -> bool {
        self.seats.contains(&user)
    }

    pub fn is_started(&self) -> bool {
        self.game.is_some()
    }

    pub fn game(&self) -> Option<&GameSession> {
        self.game.as_ref()
    }

    pub fn turn_deadline(&self) -> Option<Instant> {
        self.turn_deadline
    }

    pub fn grace_expiry(&self, user: UserId) -> Option<Instant> {
        self.grace.get(&user).copied()
    }

    /// Counts membership changes: seats taken or freed, graces begun or
    /// ended. A deferred action scheduled at one epoch is stale once the
    /// epoch has moved on.
    pub fn membership_epoch(&self) -> u64 {
        self.membership_epoch
    }

    pub fn phase(&self) -> RoomPhase {
        match &self.game {
            None => RoomPhase::Waiting,
            Some(game) if game.status() == GameStatus::Finished => RoomPhase::Finished,
            Some(_) => RoomPhase::InProgress,
        }
    }

    // -- guards -----------------------------------------------------------

    pub fn ensure_member(&self, user: UserId) -> Result<(), RoomError> {
        if self.is_member(user) {
            Ok(())
        } else {
            Err(RoomError::NotMember(user, self.id))
        }
    }

    pub fn ensure_host(&self, user: UserId) -> Result<(), RoomError> {
        if self.host == user {
            Ok(())
        } else {
            Err(RoomError::NotHost(user, self.id))
        }
    }

    /// Public rooms accept anyone. Private rooms need the exact code,
    /// compared byte for byte with no trimming or case folding, and a
    /// private room without a code admits nobody new.
    pub fn ensure_invite_code(&self, provided: Option<&str>) -> Result<(), RoomError> {
        if !self.private {
            return Ok(());
        }
        match (self.invite_code.as_deref(), provided) {
            (Some(expected), Some(given)) if !expected.is_empty() && expected == given => Ok(()),
            _ => Err(RoomError::InviteMismatch(self.id)),
        }
    }

    // -- membership -------------------------------------------------------

    /// Seats `user`, or welcomes them back.
    ///
    /// Rejoining clears any disconnect grace. A newcomer needs a free
    /// seat whether or not a game is running.
    pub fn add_player(&mut self, user: UserId) -> Result<(), RoomError> {
        if !self.is_member(user) {
            if self.seats.len() >= SEATS {
                return Err(RoomError::RoomFull(self.id));
            }
            self.seats.push(user);
            self.membership_epoch += 1;
            if !self.is_started() && !self.is_member(self.host) {
                self.host = user;
            }
        }
        if self.grace.remove(&user).is_some() {
            self.membership_epoch += 1;
            tracing::info!(room_id = %self.id, user_id = %user, "player reconnected");
        }
        tracing::debug!(
            room_id = %self.id,
            user_id = %user,
            players = self.seats.len(),
            "player seated"
        );
        Ok(())
    }

    /// Handles `user` leaving.
    ///
    /// Before a game starts the seat is freed. Once started the seat is
    /// kept and a disconnect grace runs; the returned instant is when it
    /// lapses. Leaving twice keeps the first expiry.
    pub fn remove_player(&mut self, user: UserId, now: Instant) -> Option<Instant> {
        if !self.is_member(user) {
            return None;
        }

        if self.host == user {
            if let Some(&next) = self
                .seats
                .iter()
                .find(|&&id| id != user && !self.grace.contains_key(&id))
            {
                self.host = next;
                tracing::info!(room_id = %self.id, host = %next, "host migrated");
            }
        }

        if self.is_started() {
            let expiry = match self.grace.get(&user) {
                Some(&expiry) => expiry,
                None => {
                    let expiry = now + self.config.disconnect_grace;
                    self.grace.insert(user, expiry);
                    self.membership_epoch += 1;
                    expiry
                }
            };
            tracing::info!(room_id = %self.id, user_id = %user, "player disconnected mid-game");
            Some(expiry)
        } else {
            self.seats.retain(|&id| id != user);
            self.membership_epoch += 1;
            tracing::info!(
                room_id = %self.id,
                user_id = %user,
                players = self.seats.len(),
                "player left"
            );
            None
        }
    }

    // -- game lifecycle ---------------------------------------------------

    /// Starts a game with the current seating.
    pub fn start_game(&mut self, now: Instant) -> Result<(), RoomError> {
        if self.is_started() {
            return Err(RoomError::AlreadyStarted(self.id));
        }
        if self.seats.len() != SEATS {
            return Err(RoomError::NeedTwoPlayers(self.id, self.seats.len()));
        }
        self.begin_session(now)
    }

    /// Host-only: replaces a finished game with a fresh one, same seating.
    pub fn restart_game(&mut self, caller: UserId, now: Instant) -> Result<(), RoomError> {
        self.ensure_host(caller)?;
        match &self.game {
            None => Err(RoomError::NotStarted(self.id)),
            Some(game) if game.status() != GameStatus::Finished => {
                Err(RoomError::NotFinished(self.id))
            }
            Some(_) => self.begin_session(now),
        }
    }

    /// Hands `mv` to the game session and re-arms the turn clock.
    pub fn submit_move(
        &mut self,
        user: UserId,
        mv: &GameMove,
        now: Instant,
    ) -> Result<(), RoomError> {
        if !self.is_started() {
            return Err(RoomError::NotStarted(self.id));
        }
        self.ensure_member(user)?;
        let Some(game) = self.game.as_mut() else {
            return Err(RoomError::NotStarted(self.id));
        };

        let record = game.apply_move(user, mv)?;

        if game.status() == GameStatus::Finished {
            self.turn_deadline = None;
            tracing::info!(
                room_id = %self.id,
                winner = ?game.winner(),
                draw = game.is_draw(),
                moves = record.move_number,
                "game finished"
            );
        } else {
            self.turn_deadline = Some(now + self.config.turn_timeout);
        }
        Ok(())
    }

    /// Forfeits the player to move once the turn deadline has passed.
    /// Returns `true` if the room changed.
    pub fn check_turn_timeout(&mut self, now: Instant) -> bool {
        let (Some(game), Some(deadline)) = (self.game.as_mut(), self.turn_deadline) else {
            return false;
        };
        if now < deadline {
            return false;
        }
        let Some(current) = game.current_player_id() else {
            self.turn_deadline = None;
            return false;
        };
        let Some(winner) = game.player_order().iter().copied().find(|&id| id != current) else {
            return false;
        };

        game.force_win(winner);
        self.turn_deadline = None;
        tracing::info!(
            room_id = %self.id,
            timed_out = %current,
            winner = %winner,
            "turn timed out"
        );
        true
    }

    /// Resolves `user`'s disconnect grace.
    ///
    /// If the grace has lapsed the game is torn down: the session is
    /// dropped, every seat still in grace is vacated, and the host is
    /// re-elected if needed. Returns `true` if the room changed.
    pub fn timeout_disconnected(&mut self, user: UserId, now: Instant) -> bool {
        let Some(&expiry) = self.grace.get(&user) else {
            return false;
        };
        if !self.is_started() {
            self.grace.remove(&user);
            self.membership_epoch += 1;
            return false;
        }
        if now < expiry {
            return false;
        }

        let departed: Vec<UserId> = self.grace.drain().map(|(id, _)| id).collect();
        self.seats.retain(|id| !departed.contains(id));
        self.membership_epoch += 1;
        self.game = None;
        self.turn_deadline = None;
        if !self.is_member(self.host) {
            if let Some(&first) = self.seats.first() {
                self.host = first;
            }
        }
        tracing::info!(
            room_id = %self.id,
            user_id = %user,
            vacated = departed.len(),
            "disconnect grace lapsed, room reset"
        );
        true
    }

    // -- settings ---------------------------------------------------------

    /// Host-only settings change. A blank name is ignored.
    pub fn update_settings(&mut self, caller: UserId, settings: RoomSettings) -> Result<(), RoomError> {
        self.ensure_host(caller)?;

        if let Some(game_type) = settings.game_type {
            if game_type != self.game_type {
                if self.is_started() {
                    return Err(RoomError::GameTypeLocked(self.id, game_type));
                }
                self.game_type = game_type;
            }
        }
        if let Some(name) = settings.name.as_deref().map(str::trim) {
            if !name.is_empty() {
                self.name = name.to_string();
            }
        }
        match settings.private {
            Some(true) => {
                self.private = true;
                if self.invite_code.is_none() {
                    self.invite_code = Some(generate_invite_code());
                }
            }
            Some(false) => {
                self.private = false;
                self.invite_code = None;
            }
            None => {}
        }
        Ok(())
    }

    // -- chat -------------------------------------------------------------

    /// Appends a chat line from a member.
    pub fn post_chat(&mut self, user: UserId, content: &str) -> Result<ChatMessage, RoomError> {
        self.ensure_member(user)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(RoomError::InvalidChat("message is empty"));
        }
        if content.chars().count() > MAX_CHAT_CHARS {
            return Err(RoomError::InvalidChat("message is too long"));
        }

        let message = ChatMessage {
            id: self.next_chat_id,
            room_id: self.id,
            user_id: user,
            content: content.to_string(),
            created_at_ms: epoch_millis(SystemTime::now()),
        };
        self.next_chat_id += 1;
        self.chat.push_back(message.clone());
        while self.chat.len() > self.config.chat_history_limit {
            self.chat.pop_front();
        }
        Ok(message)
    }

    /// Chat lines with an id greater than `after`, oldest first.
    pub fn chat_since(&self, user: UserId, after: u64) -> Result<Vec<ChatMessage>, RoomError> {
        self.ensure_member(user)?;
        Ok(self.chat.iter().filter(|m| m.id > after).cloned().collect())
    }

    // -- snapshot ---------------------------------------------------------

    pub fn snapshot(&self, now: Instant) -> RoomSnapshot {
        let wall_now = SystemTime::now();
        let game = self.game.as_ref();
        RoomSnapshot {
            id: self.id,
            name: self.name.clone(),
            game_type: self.game_type,
            game_type_name: self.game_type.display_name().to_string(),
            host_user_id: self.host,
            private: self.private,
            invite_code: self.invite_code.clone(),
            created_at_ms: epoch_millis(self.created_at),
            started_at_ms: game.and_then(GameSession::started_at).map(epoch_millis),
            turn_deadline_ms: self
                .turn_deadline
                .map(|deadline| wall_clock_millis(deadline, now, wall_now)),
            player_ids: self.seats.clone(),
            disconnected_ids: self
                .seats
                .iter()
                .copied()
                .filter(|id| self.grace.contains_key(id))
                .collect(),
            started: game.is_some(),
            status: self.phase(),
            current_player_id: game.and_then(GameSession::current_player_id),
            game: game.map(GameSession::snapshot),
            membership_epoch: self.membership_epoch,
        }
    }

    fn begin_session(&mut self, now: Instant) -> Result<(), RoomError> {
        let mut session = GameSession::new(self.game_type);
        session.start(&self.seats, SystemTime::now())?;
        self.game = Some(session);
        self.turn_deadline = Some(now + self.config.turn_timeout);
        tracing::info!(
            room_id = %self.id,
            game = %self.game_type,
            "game started"
        );
        Ok(())
    }
}

/// Projects a monotonic deadline onto the wall clock.
fn wall_clock_millis(deadline: Instant, now: Instant, wall_now: SystemTime) -> u64 {
    let wall = match deadline.checked_duration_since(now) {
        Some(ahead) => wall_now.checked_add(ahead),
        None => wall_now.checked_sub(now.duration_since(deadline)),
    };
    wall.map(epoch_millis).unwrap_or(0)
}

/// Six characters from [`INVITE_ALPHABET`].
pub(crate) fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_LENGTH)
        .map(|_| char::from(INVITE_ALPHABET[rng.random_range(0..INVITE_ALPHABET.len())]))
        .collect()
}

// =========================================================================
// Tests
// =========================================================================
