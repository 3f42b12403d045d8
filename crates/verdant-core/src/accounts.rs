//! Accounts and sessions.
//!
//! Produces the opaque, stable user ids the progress engine consumes.
//! Passwords are hashed with Argon2id; session tokens are random 32-byte
//! values handed to the caller once, with only their SHA-256 digest stored.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

use crate::error::{AuthError, CoreError, Result};
use crate::progress::UserId;
use crate::storage::Database;

const SESSION_TTL_DAYS: i64 = 30;

/// A freshly minted login session. The token is only ever available here;
/// the store keeps its digest.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub token: String,
}

/// Account operations over the shared database.
pub struct Accounts {
    db: Arc<Database>,
}

impl Accounts {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create an account. The returned id is the user's stable identity.
    pub fn signup(&self, username: &str, password: &str) -> Result<UserId> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials.into());
        }
        if self.db.user_by_username(username)?.is_some() {
            return Err(AuthError::UsernameTaken(username.to_string()).into());
        }
        let hash = hash_password(password)?;
        Ok(self.db.create_user(username, &hash)?)
    }

    /// Verify credentials and mint a session.
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials.into());
        }
        let Some((user_id, hash)) = self.db.user_by_username(username)? else {
            return Err(AuthError::InvalidCredentials.into());
        };
        if !verify_password(password, &hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = new_token()?;
        let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
        self.db.insert_session(&digest(&token), user_id, expires_at)?;
        Ok(Session { user_id, token })
    }

    /// Resolve a bearer token to its user. Expired sessions are pruned on
    /// the way out.
    pub fn authenticate(&self, token: &str) -> Result<UserId> {
        let token_digest = digest(token);
        let Some((user_id, expires_at)) = self.db.session(&token_digest)? else {
            return Err(AuthError::NotAuthenticated.into());
        };
        if expires_at <= Utc::now() {
            self.db.delete_session(&token_digest)?;
            return Err(AuthError::NotAuthenticated.into());
        }
        Ok(user_id)
    }

    /// Invalidate a session. Idempotent.
    pub fn logout(&self, token: &str) -> Result<()> {
        self.db.delete_session(&digest(token))?;
        Ok(())
    }

    pub fn username(&self, user: UserId) -> Result<Option<String>> {
        Ok(self.db.username(user)?)
    }
}

fn new_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| CoreError::Custom(format!("token generation failed: {e}")))?;
    Ok(hex::encode(bytes))
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> Accounts {
        Accounts::new(Arc::new(Database::open_memory().unwrap()))
    }

    #[test]
    fn signup_then_login_round_trips() {
        let accounts = accounts();
        let user = accounts.signup("ada", "hunter2hunter2").unwrap();

        let session = accounts.login("ada", "hunter2hunter2").unwrap();
        assert_eq!(session.user_id, user);
        assert_eq!(accounts.authenticate(&session.token).unwrap(), user);
        assert_eq!(accounts.username(user).unwrap().as_deref(), Some("ada"));
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let accounts = accounts();
        accounts.signup("ada", "pw-one-long-enough").unwrap();
        let err = accounts.signup("ada", "pw-two-long-enough").unwrap_err();
        assert!(matches!(err, CoreError::Auth(AuthError::UsernameTaken(_))));
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let accounts = accounts();
        accounts.signup("ada", "correct-password").unwrap();

        let err = accounts.login("ada", "wrong-password").unwrap_err();
        assert!(matches!(err, CoreError::Auth(AuthError::InvalidCredentials)));
        // Unknown users get the same answer as bad passwords.
        let err = accounts.login("ghost", "whatever-pass").unwrap_err();
        assert!(matches!(err, CoreError::Auth(AuthError::InvalidCredentials)));
    }

    #[test]
    fn empty_fields_are_rejected() {
        let accounts = accounts();
        assert!(matches!(
            accounts.signup("", "pw").unwrap_err(),
            CoreError::Auth(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            accounts.login("ada", "").unwrap_err(),
            CoreError::Auth(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn logout_invalidates_the_session() {
        let accounts = accounts();
        accounts.signup("ada", "some-password").unwrap();
        let session = accounts.login("ada", "some-password").unwrap();

        accounts.logout(&session.token).unwrap();
        assert!(accounts.authenticate(&session.token).is_err());
        // Logging out again is a no-op.
        accounts.logout(&session.token).unwrap();
    }

    #[test]
    fn expired_sessions_do_not_authenticate() {
        let db = Arc::new(Database::open_memory().unwrap());
        let accounts = Accounts::new(Arc::clone(&db));
        let user = accounts.signup("ada", "some-password").unwrap();

        let token = new_token().unwrap();
        db.insert_session(&digest(&token), user, Utc::now() - Duration::hours(1))
            .unwrap();
        assert!(matches!(
            accounts.authenticate(&token).unwrap_err(),
            CoreError::Auth(AuthError::NotAuthenticated)
        ));
        // The stale row was pruned.
        assert!(db.session(&digest(&token)).unwrap().is_none());
    }

    #[test]
    fn tokens_are_unique_per_login() {
        let accounts = accounts();
        accounts.signup("ada", "some-password").unwrap();
        let a = accounts.login("ada", "some-password").unwrap();
        let b = accounts.login("ada", "some-password").unwrap();
        assert_ne!(a.token, b.token);
        // Both stay valid until logged out.
        assert!(accounts.authenticate(&a.token).is_ok());
        assert!(accounts.authenticate(&b.token).is_ok());
    }
}
