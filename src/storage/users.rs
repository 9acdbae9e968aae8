use chrono::{DateTime, Utc};
use redb::{ReadableTable, ReadableTableMetadata};

use super::db::{Database, DatabaseError};
use super::models::{SessionRecord, UserRecord};
use super::tables::*;

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Store a user unless the email is taken. Returns false on a duplicate email.
    pub fn insert_user(&self, user: &UserRecord) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let inserted = {
            let mut email_table = write_txn.open_table(USER_EMAILS)?;
            let taken = email_table.get(user.email.as_str())?.is_some();
            if taken {
                false
            } else {
                email_table.insert(user.email.as_str(), user.id.as_str())?;
                let mut table = write_txn.open_table(USERS)?;
                let data = rmp_serde::to_vec_named(user)?;
                table.insert(user.id.as_str(), data.as_slice())?;
                true
            }
        };

        if inserted {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(inserted)
    }

    /// Get a user by UUID
    pub fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get a user by email (resolves email -> uuid -> user)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let email_table = read_txn.open_table(USER_EMAILS)?;

        let id = match email_table.get(email)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let users_table = read_txn.open_table(USERS)?;
        match users_table.get(id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Session operations
    // ========================================================================

    pub fn put_session(&self, token: &str, session: &SessionRecord) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            let data = rmp_serde::to_vec_named(session)?;
            table.insert(token, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Resolve a token to its user id.
    ///
    /// An expired session resolves to `None` and its row is deleted.
    pub fn get_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, DatabaseError> {
        let session: Option<SessionRecord> = {
            let read_txn = self.begin_read()?;
            let table = read_txn.open_table(SESSIONS)?;
            let result = match table.get(token)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        match session {
            Some(session) if session.expires_at > now => Ok(Some(session.user_id)),
            Some(_) => {
                self.expire_session(token, now)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Delete a session if it is still expired at `now`. A concurrent login
    /// may have replaced the row, so the expiry is checked again under the
    /// write transaction.
    fn expire_session(&self, token: &str, now: DateTime<Utc>) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            let expired = match table.get(token)? {
                Some(data) => {
                    let session: SessionRecord = rmp_serde::from_slice(data.value())?;
                    session.expires_at <= now
                }
                None => false,
            };
            if expired {
                table.remove(token)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Delete every session that expired before `now`, returning how many.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(SESSIONS)?;
            let mut expired = Vec::new();
            for result in table.iter()? {
                let (key, value) = result?;
                let session: SessionRecord = rmp_serde::from_slice(value.value())?;
                if session.expires_at <= now {
                    expired.push(key.value().to_string());
                }
            }
            for token in &expired {
                table.remove(token.as_str())?;
            }
            expired.len() as u64
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Number of stored sessions, expired or not
    pub fn session_count(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        Ok(table.len()?)
    }

    /// Remove a session. Returns whether it existed.
    pub fn delete_session(&self, token: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(SESSIONS)?;
            let removed = table.remove(token)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}
