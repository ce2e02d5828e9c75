//! In-memory user registry: unique usernames, password credentials,
//! profiles, and session tokens.
//!
//! Usernames are unique ignoring case. The uniqueness check and the insert
//! happen under one map entry, so two concurrent registrations of the
//! same name cannot both succeed.
//!
//! Passwords are kept only as `SHA-256(salt ":" password)` with a random
//! 16-byte salt per user.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use duelhall_protocol::{UserId, epoch_millis};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::{Authenticator, SessionError, UserLookup, UserProfile};

const MAX_USERNAME_CHARS: usize = 32;

#[derive(Debug)]
pub struct UserRegistry {
    /// Lower-cased username to id.
    by_name: DashMap<String, UserId>,
    profiles: DashMap<UserId, UserProfile>,
    credentials: DashMap<UserId, Credential>,
    /// Issued token to the user it authenticates.
    tokens: DashMap<String, UserId>,
    next_id: AtomicU64,
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRegistry {
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            profiles: DashMap::new(),
            credentials: DashMap::new(),
            tokens: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a user.
    ///
    /// # Errors
    /// - [`SessionError::InvalidUsername`] if the trimmed name is empty or
    ///   longer than 32 characters
    /// - [`SessionError::InvalidPassword`] if the password is blank
    /// - [`SessionError::UsernameTaken`] if the name exists in any case
    pub fn register(&self, username: &str, password: &str) -> Result<UserProfile, SessionError> {
        let username = username.trim();
        let chars = username.chars().count();
        if chars == 0 || chars > MAX_USERNAME_CHARS {
            return Err(SessionError::InvalidUsername);
        }
        if password.trim().is_empty() {
            return Err(SessionError::InvalidPassword);
        }

        match self.by_name.entry(username.to_lowercase()) {
            Entry::Occupied(_) => Err(SessionError::UsernameTaken(username.to_string())),
            Entry::Vacant(slot) => {
                let id = UserId(self.next_id.fetch_add(1, Ordering::Relaxed));
                let profile = UserProfile {
                    id,
                    username: username.to_string(),
                    created_at_ms: epoch_millis(SystemTime::now()),
                };
                self.credentials.insert(id, Credential::new(password));
                self.profiles.insert(id, profile.clone());
                slot.insert(id);
                tracing::info!(user_id = %id, %username, "user registered");
                Ok(profile)
            }
        }
    }

    /// Checks the password and issues a new token.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the user does not exist or the
    /// password is wrong. The two cases are indistinguishable.
    pub fn login(&self, username: &str, password: &str) -> Result<(UserProfile, String), SessionError> {
        let verified = self.find_by_username(username).filter(|profile| {
            self.credentials
                .get(&profile.id)
                .is_some_and(|credential| credential.verify(password))
        });
        let Some(profile) = verified else {
            tracing::warn!(username = username.trim(), "invalid login attempt");
            return Err(SessionError::AuthFailed("invalid credentials".into()));
        };
        let token = self.issue_token(profile.id)?;
        tracing::info!(user_id = %profile.id, "user logged in");
        Ok((profile, token))
    }

    /// Mints a random token that authenticates as `user`.
    pub fn issue_token(&self, user: UserId) -> Result<String, SessionError> {
        if !self.profiles.contains_key(&user) {
            return Err(SessionError::UserNotFound(user));
        }
        let token = generate_token();
        self.tokens.insert(token.clone(), user);
        tracing::debug!(user_id = %user, "session token issued");
        Ok(token)
    }

    /// Returns `true` if the token existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn find_by_username(&self, username: &str) -> Option<UserProfile> {
        let id = *self.by_name.get(&username.trim().to_lowercase())?;
        self.profiles.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl UserLookup for UserRegistry {
    fn find(&self, id: UserId) -> Result<UserProfile, SessionError> {
        self.profiles
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::UserNotFound(id))
    }
}

impl Authenticator for UserRegistry {
    async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
        self.tokens
            .get(token)
            .map(|entry| *entry.value())
            .ok_or(SessionError::InvalidToken)
    }
}

/// A salted password digest.
struct Credential {
    salt: [u8; 16],
    digest: [u8; 32],
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

impl Credential {
    fn new(password: &str) -> Self {
        let salt: [u8; 16] = rand::rng().random();
        Self {
            salt,
            digest: salted_digest(&salt, password),
        }
    }

    /// Compares every byte so the time taken does not depend on where the
    /// digests differ.
    fn verify(&self, password: &str) -> bool {
        salted_digest(&self.salt, password)
            .iter()
            .zip(&self.digest)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

fn salted_digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// 128 random bits as 32 lowercase hex characters.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_sequential_ids() {
        let registry = UserRegistry::new();
        let ann = registry.register("ann", "pw").unwrap();
        let bob = registry.register("  bob ", "pw").unwrap();

        assert_eq!(ann.id, UserId(1));
        assert_eq!(bob.id, UserId(2));
        assert_eq!(bob.username, "bob");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_duplicate_ignores_case() {
        let registry = UserRegistry::new();
        registry.register("Ann", "pw").unwrap();

        let err = registry.register("aNN", "pw").unwrap_err();

        assert!(matches!(err, SessionError::UsernameTaken(ref name) if name == "aNN"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_bad_lengths() {
        let registry = UserRegistry::new();
        assert!(matches!(registry.register("   ", "pw"), Err(SessionError::InvalidUsername)));
        assert!(matches!(
            registry.register(&"x".repeat(33), "pw"),
            Err(SessionError::InvalidUsername)
        ));
        assert!(registry.register(&"x".repeat(32), "pw").is_ok());
    }

    #[test]
    fn test_find_unknown_is_not_found() {
        let registry = UserRegistry::new();
        let err = registry.find(UserId(9)).unwrap_err();
        assert!(matches!(err, SessionError::UserNotFound(UserId(9))));
    }

    #[test]
    fn test_generate_token_is_32_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_issue_token_unknown_user_fails() {
        let registry = UserRegistry::new();
        assert!(matches!(
            registry.issue_token(UserId(4)),
            Err(SessionError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_login_token_authenticates_until_revoked() {
        let registry = UserRegistry::new();
        let ann = registry.register("ann", "pw").unwrap();

        let (profile, token) = registry.login("ANN", "pw").unwrap();
        assert_eq!(profile, ann);
        assert_eq!(registry.authenticate(&token).await.unwrap(), ann.id);

        assert!(registry.revoke(&token));
        assert!(!registry.revoke(&token));
        assert!(matches!(
            registry.authenticate(&token).await,
            Err(SessionError::InvalidToken)
        ));
    }

    #[test]
    fn test_login_unknown_user_is_unauthorized() {
        let registry = UserRegistry::new();
        let err = registry.login("ghost", "pw").unwrap_err();
        assert_eq!(err.kind(), duelhall_protocol::ErrorKind::Unauthorized);
    }

    #[test]
    fn test_login_wrong_password_is_unauthorized() {
        let registry = UserRegistry::new();
        registry.register("ann", "correct horse").unwrap();

        let err = registry.login("ann", "battery staple").unwrap_err();
        assert!(matches!(err, SessionError::AuthFailed(_)));
        assert!(registry.login("ann", "").is_err());
        assert!(registry.tokens.is_empty(), "no token for a failed login");

        assert!(registry.login("ann", "correct horse").is_ok());
    }

    #[test]
    fn test_register_requires_password() {
        let registry = UserRegistry::new();
        assert!(matches!(
            registry.register("ann", "   "),
            Err(SessionError::InvalidPassword)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_same_password_gets_different_digests() {
        let a = Credential::new("hunter2");
        let b = Credential::new("hunter2");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.digest, b.digest);
        assert!(a.verify("hunter2"));
        assert!(!a.verify("hunter3"));
    }

    #[test]
    fn test_concurrent_registration_of_same_name_admits_one() {
        let registry = std::sync::Arc::new(UserRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = std::sync::Arc::clone(&registry);
                std::thread::spawn(move || registry.register("race", "pw").is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }
}
