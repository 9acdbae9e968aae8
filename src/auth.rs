//! Users, passwords and session tokens.

use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use ring::digest;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::storage::models::{SessionRecord, UserRecord};
use crate::storage::Database;

/// Who is making a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Requestor {
    User(UserRecord),
    Anonymous,
}

impl Requestor {
    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            Requestor::User(user) => Some(user),
            Requestor::Anonymous => None,
        }
    }

    /// The authenticated user, or `Unauthorized`.
    pub fn require_user(&self) -> Result<&UserRecord> {
        self.user().ok_or(Error::Unauthorized)
    }
}

/// Hex-encoded SHA-1 of a password, the format stored in `UserRecord`.
pub fn hash_password(password: &str) -> String {
    hex::encode(digest::digest(
        &digest::SHA1_FOR_LEGACY_USE_ONLY,
        password.as_bytes(),
    ))
}

/// How often expired sessions are swept from storage
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct Authenticator {
    db: Database,
    session_ttl: Duration,
}

impl Authenticator {
    pub fn new(db: Database, session_ttl: Duration) -> Self {
        Self { db, session_ttl }
    }

    /// Create a user account.
    pub fn register(&self, email: Option<&str>, password: Option<&str>) -> Result<UserRecord> {
        let email = email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Error::invalid("Missing email"))?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::invalid("Missing password"))?;

        let user = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: hash_password(password),
        };

        if !self.db.insert_user(&user)? {
            return Err(Error::invalid("Already exist"));
        }

        tracing::debug!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Exchange an `Authorization: Basic ...` header for a session token.
    pub fn connect(&self, authorization: Option<&str>) -> Result<String> {
        let (email, password) = authorization
            .and_then(parse_basic_auth)
            .ok_or(Error::Unauthorized)?;

        let user = self
            .db
            .get_user_by_email(&email)?
            .filter(|u| u.password_hash == hash_password(&password))
            .ok_or(Error::Unauthorized)?;

        let token = uuid::Uuid::new_v4().to_string();
        let ttl = chrono::Duration::from_std(self.session_ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);
        self.db.put_session(
            &token,
            &SessionRecord {
                user_id: user.id.clone(),
                expires_at,
            },
        )?;

        tracing::debug!(user_id = %user.id, "Opened session");
        Ok(token)
    }

    /// Invalidate a session token.
    pub fn disconnect(&self, token: Option<&str>) -> Result<()> {
        let token = token.ok_or(Error::Unauthorized)?;
        if self.db.get_session_user(token, Utc::now())?.is_none() {
            return Err(Error::Unauthorized);
        }
        self.db.delete_session(token)?;
        Ok(())
    }

    /// Resolve an `X-Token` value. Missing, unknown and expired tokens, and
    /// tokens of deleted users, all identify as anonymous.
    pub fn identify(&self, token: Option<&str>) -> Result<Requestor> {
        let Some(token) = token else {
            return Ok(Requestor::Anonymous);
        };
        let Some(user_id) = self.db.get_session_user(token, Utc::now())? else {
            return Ok(Requestor::Anonymous);
        };
        Ok(match self.db.get_user(&user_id)? {
            Some(user) => Requestor::User(user),
            None => Requestor::Anonymous,
        })
    }

    /// Delete sessions that have expired, returning how many were removed.
    pub fn sweep_expired(&self) -> Result<u64> {
        Ok(self.db.purge_expired_sessions(Utc::now())?)
    }
}

/// Periodically delete expired sessions until `shutdown` fires.
///
/// Tokens that are looked up after expiry are deleted on the spot; this
/// catches the ones nobody presents again.
pub async fn sweep_sessions(auth: Authenticator, every: Duration, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    // Skip the first immediate tick
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        match auth.sweep_expired() {
            Ok(0) => tracing::debug!("No expired sessions to clean up"),
            Ok(count) => tracing::info!(deleted_count = count, "Cleaned up expired sessions"),
            Err(e) => tracing::warn!(error = %e, "Failed to clean up expired sessions"),
        }
    }
}

/// Decode `Basic base64(email:password)` into its two parts.
fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?.trim();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}
