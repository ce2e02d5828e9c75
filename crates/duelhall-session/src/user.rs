//! User profiles and the lookup the lobby resolves them through.

use std::sync::Arc;

use duelhall_protocol::UserId;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Public profile data shown next to a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub created_at_ms: u64,
}

/// Finds a user's profile by id.
pub trait UserLookup: Send + Sync + 'static {
    /// # Errors
    /// [`SessionError::UserNotFound`] for an unknown id.
    fn find(&self, id: UserId) -> Result<UserProfile, SessionError>;
}

impl<T: UserLookup> UserLookup for Arc<T> {
    fn find(&self, id: UserId) -> Result<UserProfile, SessionError> {
        (**self).find(id)
    }
}
