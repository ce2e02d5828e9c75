//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Every operation on a room becomes a [`RoomCommand`] on the actor's
//! channel, so operations on one room run strictly one after another
//! while different rooms never wait on each other.

use std::time::SystemTime;

use duelhall_protocol::{ChatMessage, GameMove, RoomId, UserId};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::room::{Room, RoomSettings, RoomSnapshot};
use crate::RoomError;

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// What a leave did.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub snapshot: RoomSnapshot,
    /// Set when the leaver's seat is held for a reconnect.
    pub grace_until: Option<Instant>,
    /// The room has no members left.
    pub now_empty: bool,
    /// The room's membership epoch after the leave.
    pub membership_epoch: u64,
}

/// What a disconnect-grace check did.
#[derive(Debug, Clone)]
pub struct DisconnectOutcome {
    /// `None` if nothing changed.
    pub snapshot: Option<RoomSnapshot>,
    pub now_empty: bool,
    /// Set while the user's grace is still running.
    pub grace_until: Option<Instant>,
    pub membership_epoch: u64,
}

pub(crate) enum RoomCommand {
    Join {
        user: UserId,
        invite_code: Option<String>,
        reply: Reply<RoomSnapshot>,
    },
    Leave {
        user: UserId,
        reply: Reply<LeaveOutcome>,
    },
    Start {
        caller: UserId,
        reply: Reply<RoomSnapshot>,
    },
    Move {
        user: UserId,
        mv: GameMove,
        reply: Reply<RoomSnapshot>,
    },
    Restart {
        caller: UserId,
        reply: Reply<RoomSnapshot>,
    },
    UpdateSettings {
        caller: UserId,
        settings: RoomSettings,
        reply: Reply<RoomSnapshot>,
    },
    PostChat {
        user: UserId,
        content: String,
        reply: Reply<ChatMessage>,
    },
    ChatSince {
        user: UserId,
        after: u64,
        reply: Reply<Vec<ChatMessage>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    CheckTurnTimeout {
        reply: oneshot::Sender<Option<RoomSnapshot>>,
    },
    TimeoutDisconnected {
        user: UserId,
        reply: oneshot::Sender<DisconnectOutcome>,
    },
    /// Stops the actor only if nobody is seated and membership is still
    /// at `epoch`. Replies `true` if it stopped.
    CloseIfEmpty {
        epoch: u64,
        reply: oneshot::Sender<bool>,
    },
    /// Host-only stop.
    Close {
        caller: UserId,
        reply: Reply<()>,
    },
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone; the directory keeps one per room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    created_at: SystemTime,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Seats `user`. Members rejoin freely; newcomers to a private room
    /// must present the invite code.
    pub async fn join(
        &self,
        user: UserId,
        invite_code: Option<String>,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Join {
            user,
            invite_code,
            reply,
        })
        .await?
    }

    pub async fn leave(&self, user: UserId) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { user, reply }).await?
    }

    /// Host-only.
    pub async fn start(&self, caller: UserId) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Start { caller, reply }).await?
    }

    pub async fn submit_move(&self, user: UserId, mv: GameMove) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Move { user, mv, reply })
            .await?
    }

    pub async fn restart(&self, caller: UserId) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Restart { caller, reply })
            .await?
    }

    pub async fn update_settings(
        &self,
        caller: UserId,
        settings: RoomSettings,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::UpdateSettings {
            caller,
            settings,
            reply,
        })
        .await?
    }

    pub async fn post_chat(&self, user: UserId, content: String) -> Result<ChatMessage, RoomError> {
        self.request(|reply| RoomCommand::PostChat {
            user,
            content,
            reply,
        })
        .await?
    }

    pub async fn chat_since(&self, user: UserId, after: u64) -> Result<Vec<ChatMessage>, RoomError> {
        self.request(|reply| RoomCommand::ChatSince { user, after, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Forfeits the player to move if their deadline has passed. Returns
    /// the new snapshot only when the room changed.
    pub async fn check_turn_timeout(&self) -> Result<Option<RoomSnapshot>, RoomError> {
        self.request(|reply| RoomCommand::CheckTurnTimeout { reply })
            .await
    }

    pub async fn timeout_disconnected(&self, user: UserId) -> Result<DisconnectOutcome, RoomError> {
        self.request(|reply| RoomCommand::TimeoutDisconnected { user, reply })
            .await
    }

    /// Stops the room if it has stayed empty since membership epoch
    /// `epoch`. A join that reached the actor first keeps the room alive,
    /// even if the room has emptied again since.
    pub async fn close_if_empty(&self, epoch: u64) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::CloseIfEmpty { epoch, reply })
            .await
    }

    /// Stops the room on behalf of its host.
    pub async fn close(&self, caller: UserId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Close { caller, reply })
            .await?
    }

    /// Tells the room to stop without waiting for it.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Sends a command carrying a reply channel and waits for the answer.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

struct RoomActor {
    room: Room,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        let room_id = self.room.id();
        tracing::info!(%room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            let now = Instant::now();
            match cmd {
                RoomCommand::Join {
                    user,
                    invite_code,
                    reply,
                } => {
                    let _ = reply.send(self.handle_join(user, invite_code.as_deref(), now));
                }
                RoomCommand::Leave { user, reply } => {
                    let _ = reply.send(self.handle_leave(user, now));
                }
                RoomCommand::Start { caller, reply } => {
                    let result = self
                        .room
                        .ensure_host(caller)
                        .and_then(|()| self.room.start_game(now))
                        .map(|()| self.room.snapshot(now));
                    let _ = reply.send(result);
                }
                RoomCommand::Move { user, mv, reply } => {
                    let result = self
                        .room
                        .submit_move(user, &mv, now)
                        .map(|()| self.room.snapshot(now));
                    if let Err(err) = &result {
                        tracing::debug!(%room_id, user_id = %user, %err, "move rejected");
                    }
                    let _ = reply.send(result);
                }
                RoomCommand::Restart { caller, reply } => {
                    let result = self
                        .room
                        .restart_game(caller, now)
                        .map(|()| self.room.snapshot(now));
                    let _ = reply.send(result);
                }
                RoomCommand::UpdateSettings {
                    caller,
                    settings,
                    reply,
                } => {
                    let result = self
                        .room
                        .update_settings(caller, settings)
                        .map(|()| self.room.snapshot(now));
                    let _ = reply.send(result);
                }
                RoomCommand::PostChat {
                    user,
                    content,
                    reply,
                } => {
                    let _ = reply.send(self.room.post_chat(user, &content));
                }
                RoomCommand::ChatSince { user, after, reply } => {
                    let _ = reply.send(self.room.chat_since(user, after));
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.room.snapshot(now));
                }
                RoomCommand::CheckTurnTimeout { reply } => {
                    let changed = self.room.check_turn_timeout(now);
                    let _ = reply.send(changed.then(|| self.room.snapshot(now)));
                }
                RoomCommand::TimeoutDisconnected { user, reply } => {
                    let changed = self.room.timeout_disconnected(user, now);
                    let _ = reply.send(DisconnectOutcome {
                        snapshot: changed.then(|| self.room.snapshot(now)),
                        now_empty: self.room.member_count() == 0,
                        grace_until: self.room.grace_expiry(user),
                        membership_epoch: self.room.membership_epoch(),
                    });
                }
                RoomCommand::CloseIfEmpty { epoch, reply } => {
                    let close = self.room.member_count() == 0
                        && self.room.membership_epoch() == epoch;
                    let _ = reply.send(close);
                    if close {
                        tracing::info!(%room_id, "empty room closed");
                        break;
                    }
                    tracing::debug!(%room_id, epoch, "room repopulated, close skipped");
                }
                RoomCommand::Close { caller, reply } => {
                    let result = self.room.ensure_host(caller);
                    let closing = result.is_ok();
                    let _ = reply.send(result);
                    if closing {
                        tracing::info!(%room_id, host = %caller, "room closed by host");
                        break;
                    }
                }
                RoomCommand::Shutdown => {
                    tracing::info!(%room_id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(%room_id, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        user: UserId,
        invite_code: Option<&str>,
        now: Instant,
    ) -> Result<RoomSnapshot, RoomError> {
        if !self.room.is_member(user) {
            self.room.ensure_invite_code(invite_code)?;
        }
        self.room.add_player(user)?;
        tracing::info!(
            room_id = %self.room.id(),
            user_id = %user,
            players = self.room.member_count(),
            "player joined"
        );
        Ok(self.room.snapshot(now))
    }

    fn handle_leave(&mut self, user: UserId, now: Instant) -> Result<LeaveOutcome, RoomError> {
        let grace_until = self.room.remove_player(user, now);
        Ok(LeaveOutcome {
            snapshot: self.room.snapshot(now),
            grace_until,
            now_empty: self.room.member_count() == 0,
            membership_epoch: self.room.membership_epoch(),
        })
    }
}

/// Spawns an actor that owns `room` and returns a handle to it.
///
/// `buffer` bounds the command channel; senders wait when it is full.
pub fn spawn_room(room: Room, buffer: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let handle = RoomHandle {
        room_id: room.id(),
        created_at: room.created_at(),
        sender: tx,
    };
    tokio::spawn(RoomActor { room, receiver: rx }.run());
    handle
}
