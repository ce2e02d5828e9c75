//! Error types for the user layer.

use duelhall_protocol::{ErrorKind, UserId};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Login refused: unknown username or wrong password.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The token was never issued or has been revoked.
    #[error("invalid session token")]
    InvalidToken,

    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("username must be 1 to 32 characters")]
    InvalidUsername,

    #[error("password is required")]
    InvalidPassword,

    #[error("user {0} not found")]
    UserNotFound(UserId),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthFailed(_) | Self::InvalidToken => ErrorKind::Unauthorized,
            Self::UsernameTaken(_) => ErrorKind::Conflict,
            Self::InvalidUsername | Self::InvalidPassword => ErrorKind::Validation,
            Self::UserNotFound(_) => ErrorKind::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_to_status() {
        assert_eq!(SessionError::InvalidToken.kind().status_code(), 401);
        assert_eq!(SessionError::UsernameTaken("ann".into()).kind().status_code(), 409);
        assert_eq!(SessionError::InvalidUsername.kind().status_code(), 400);
        assert_eq!(SessionError::InvalidPassword.kind().status_code(), 400);
        assert_eq!(SessionError::UserNotFound(UserId(3)).kind().status_code(), 404);
    }

    #[test]
    fn test_user_not_found_message() {
        let err = SessionError::UserNotFound(UserId(3));
        assert_eq!(err.to_string(), "user U-3 not found");
    }
}
