//! Token authentication.
//!
//! The lobby never sees passwords or tokens directly; an adapter calls an
//! [`Authenticator`] first and hands the lobby the resulting [`UserId`].

use duelhall_protocol::UserId;

use crate::SessionError;

/// Resolves a session token to the user it was issued for.
///
/// `Send + Sync + 'static` so one authenticator can be shared by every
/// request task for the life of the process.
///
/// ```rust
/// use duelhall_protocol::UserId;
/// use duelhall_session::{Authenticator, SessionError};
///
/// /// Treats the token as a numeric id. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
///         token.parse().map(UserId).map_err(|_| SessionError::InvalidToken)
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// # Errors
    /// [`SessionError::InvalidToken`] if the token is unknown or revoked.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserId, SessionError>> + Send;
}
