//! Session store: the single source of truth for "is a caller authenticated".
//!
//! ARCHITECTURE
//! ============
//! The session is a bearer token plus an open user record. Both are persisted
//! under two keys (`authToken`, `user`) in a [`KeyValueStore`] and mirrored in
//! memory. Every mutation writes storage first, under the same lock that
//! guards the in-memory copy, so the two never disagree about "logged in".
//!
//! TRADE-OFFS
//! ==========
//! `load` never fails: missing halves, an unparseable user, or an unreadable
//! backend all collapse to the logged-out state. Callers lose the reason, but
//! a half-hydrated session can never exist.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::{KeyValueStore, StorageError};

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "authToken";
/// Storage key for the serialized user record.
pub const USER_KEY: &str = "user";

// =============================================================================
// USER
// =============================================================================

/// Open user profile record. No schema beyond "a JSON object"; callers probe
/// for the fields they need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(Map<String, Value>);

impl User {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, returning `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// User id as a string; numeric ids are rendered.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for User {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Authenticated identity and credential. Always both or neither.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Holds the session in memory and writes it through to durable storage.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Create an empty store. Call [`SessionStore::load`] once at startup to
    /// pick up a persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage, current: RwLock::new(None) }
    }

    /// Hydrate from storage, self-healing to the logged-out state when the
    /// persisted pair is incomplete or unreadable.
    pub fn load(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        match self.read_persisted() {
            Ok(Persisted::Session(session)) => {
                tracing::debug!(user_id = session.user.id().as_deref(), "restored persisted session");
                *current = Some(session);
            }
            Ok(Persisted::Empty) => {
                *current = None;
            }
            Ok(Persisted::Invalid) => {
                tracing::warn!("discarding incomplete or unreadable persisted session");
                self.clear_persisted();
                *current = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "session storage unreadable; starting logged out");
                self.clear_persisted();
                *current = None;
            }
        }
    }

    /// Persist `user` and `token` together, then adopt them in memory.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written; memory is
    /// left untouched in that case.
    pub fn login(&self, user: User, token: impl Into<String>) -> Result<(), StorageError> {
        let token = token.into();
        let serialized = serde_json::to_string(&user)?;

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.storage
            .set_all(&[(TOKEN_KEY, token.as_str()), (USER_KEY, serialized.as_str())])?;
        tracing::info!(user_id = user.id().as_deref(), "session stored");
        *current = Some(Session { user, token });
        Ok(())
    }

    /// Remove the persisted pair and clear memory. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written; memory is
    /// left untouched in that case.
    pub fn logout(&self) -> Result<(), StorageError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.storage.remove_all(&[TOKEN_KEY, USER_KEY])?;
        if current.take().is_some() {
            tracing::info!("session cleared");
        }
        Ok(())
    }

    /// Drop a session the server has rejected. Memory is cleared even when
    /// storage cannot be, since the token is already dead. A persisted pair
    /// left behind comes back on the next `load` and is rejected again.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the persisted pair could not be removed.
    pub fn expire(&self) -> Result<(), StorageError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = None;
        self.storage.remove_all(&[TOKEN_KEY, USER_KEY])
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Snapshot of the current user. Stale once the session changes.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.user.clone())
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.token.clone())
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn read_persisted(&self) -> Result<Persisted, StorageError> {
        let token = self.storage.get(TOKEN_KEY)?;
        let user = self.storage.get(USER_KEY)?;
        Ok(match (token, user) {
            (None, None) => Persisted::Empty,
            (Some(token), Some(raw)) => match parse_user(&raw) {
                Some(user) => Persisted::Session(Session { user, token }),
                None => Persisted::Invalid,
            },
            _ => Persisted::Invalid,
        })
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.storage.remove_all(&[TOKEN_KEY, USER_KEY]) {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
    }
}

enum Persisted {
    Empty,
    Invalid,
    Session(Session),
}

fn parse_user(raw: &str) -> Option<User> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => User::from_value(value),
        Err(_) => None,
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
