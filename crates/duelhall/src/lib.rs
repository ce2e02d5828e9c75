//! # Duelhall
//!
//! Two-player board game rooms: Gobang and Chinese chess, with turn
//! clocks, disconnect grace, and live push updates.
//!
//! The [`Lobby`] is the surface an HTTP or WebSocket adapter talks to.
//! It needs a [`UserLookup`](duelhall_session::UserLookup) to resolve
//! player profiles and a [`PushSink`] to report changes to.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelhall::prelude::*;
//!
//! # async fn demo() -> Result<(), LobbyError> {
//! let users = std::sync::Arc::new(UserRegistry::new());
//! let lobby = LobbyBuilder::new().build(users.clone(), RoomHub::default());
//! let _clock = lobby.spawn_turn_clock();
//!
//! let ann = users.register("ann", "ann-password")?;
//! let bob = users.register("bob", "bob-password")?;
//! let room = lobby.create_room(ann.id, "evening", GameType::Gobang, false).await?;
//! lobby.join_room(bob.id, room.room.id, None).await?;
//! lobby.start_game(ann.id, room.room.id).await?;
//! lobby.submit_move(ann.id, room.room.id, GameMove::Stone { x: 7, y: 7 }).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod lobby;
mod push;
mod view;

pub use error::LobbyError;
pub use lobby::{LeaveResult, Lobby, LobbyBuilder, LobbyConfig, TimerKey};
pub use push::{PushEvent, PushSink, RoomHub};
pub use view::RoomView;

/// Everything an adapter usually needs.
pub mod prelude {
    pub use crate::{
        LeaveResult, Lobby, LobbyBuilder, LobbyConfig, LobbyError, PushSink, RoomHub, RoomView,
    };
    pub use duelhall_protocol::{
        ChatMessage, Codec, ErrorKind, GameInfo, GameMove, GameType, JsonCodec, RoomId, UserId,
    };
    pub use duelhall_room::{RoomConfig, RoomPhase, RoomSettings, RoomSnapshot};
    pub use duelhall_rules::{GameSnapshot, GameStatus, RuleError};
    pub use duelhall_session::{Authenticator, UserLookup, UserProfile, UserRegistry};
}
