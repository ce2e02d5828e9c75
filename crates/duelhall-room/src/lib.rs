//! Rooms for Duelhall.
//!
//! A room seats two players, runs one game session at a time, and keeps
//! the clocks that end a stalled game. Each room lives in its own Tokio
//! task (actor model); the task owns the [`Room`] state machine and is the
//! only thing that ever mutates it.
//!
//! # Key types
//!
//! - [`Room`] — the synchronous state machine, testable without a runtime
//! - [`RoomHandle`] — sends commands to a running room actor
//! - [`RoomDirectory`] — concurrent map of live rooms
//! - [`RoomSnapshot`] — what callers get back from every operation
//! - [`RoomConfig`] — turn timeout, disconnect grace, chat history size

mod actor;
mod config;
mod directory;
mod error;
mod room;

pub use actor::{DisconnectOutcome, LeaveOutcome, RoomHandle, spawn_room};
pub use config::{RoomConfig, RoomPhase, SEATS};
pub use directory::{RoomDirectory, RoomFilter};
pub use error::RoomError;
pub use room::{Room, RoomSettings, RoomSnapshot};
