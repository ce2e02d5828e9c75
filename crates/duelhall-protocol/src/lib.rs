//! Shared vocabulary for Duelhall.
//!
//! This crate sits at the bottom of the stack. It defines:
//!
//! - identity newtypes ([`UserId`], [`RoomId`])
//! - the game catalog ([`GameType`], [`GameInfo`]) and move payloads ([`GameMove`])
//! - [`ChatMessage`]
//! - the error taxonomy every layer maps onto ([`ErrorKind`])
//! - the [`Codec`] trait with a JSON implementation
//!
//! ```text
//! duelhall (facade)
//!     ↕
//! room / scheduler / session
//!     ↕
//! rules
//!     ↕
//! protocol (this crate)
//! ```

mod codec;
mod error;
mod game;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use game::{GameInfo, GameMove, GameType};
pub use types::{ChatMessage, ErrorKind, RoomId, UserId, epoch_millis};
