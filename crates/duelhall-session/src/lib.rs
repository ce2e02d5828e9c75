//! Users for Duelhall.
//!
//! Rooms only ever hold [`UserId`](duelhall_protocol::UserId)s. This crate
//! owns everything else about a user:
//!
//! 1. **Registration** — unique usernames, salted passwords ([`UserRegistry::register`])
//! 2. **Authentication** — password login, opaque session tokens ([`Authenticator`])
//! 3. **Lookup** — profiles for room views ([`UserLookup`])
//!
//! ```text
//! Lobby (above)  ← resolves seated ids to profiles
//!     ↕
//! Users (this crate)
//!     ↕
//! Protocol (below)  ← UserId, ErrorKind
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod registry;
mod user;

pub use auth::Authenticator;
pub use error::SessionError;
pub use registry::UserRegistry;
pub use user::{UserLookup, UserProfile};
