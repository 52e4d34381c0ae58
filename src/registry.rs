//! Connection registry and username directory
//!
//! Holds the two coupled maps (connection → session, username → connection)
//! behind a single `RwLock`, so every mutation updates both halves of the
//! bijection in one critical section. The lock is never held across an
//! `.await`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::{AppError, ValidationError};
use crate::hub::HubHandle;
use crate::message::Message;
use crate::session::Session;
use crate::types::ConnectionId;
use crate::username;

#[derive(Debug, Default)]
struct Tables {
    /// All registered sessions: ConnectionId -> Session
    sessions: HashMap<ConnectionId, Session>,
    /// Reverse mapping for uniqueness checks: username -> ConnectionId
    names: HashMap<String, ConnectionId>,
}

/// Registry of active sessions
#[derive(Debug, Default)]
pub struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is recovered: no mutation leaves the maps half-updated.
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether no connection currently holds `name`
    pub fn is_available(&self, name: &str) -> bool {
        !self.read().names.contains_key(name)
    }

    /// Register a session under its username
    ///
    /// Validates the format, checks availability and inserts both halves
    /// of the mapping under one write lock.
    pub fn register(&self, session: Session) -> Result<(), ValidationError> {
        if !username::validate(&session.username) {
            return Err(ValidationError::InvalidFormat);
        }

        let mut tables = self.write();
        if tables.names.contains_key(&session.username) {
            return Err(ValidationError::Taken);
        }

        info!(
            "Client registered: {} ({}) as {}",
            session.id, session.addr, session.username
        );
        tables.names.insert(session.username.clone(), session.id);
        tables.sessions.insert(session.id, session);
        debug!("Total clients: {}", tables.sessions.len());
        Ok(())
    }

    /// Remove a session and its username
    ///
    /// No-op if the connection was never registered.
    pub fn unregister(&self, id: ConnectionId) -> Option<Session> {
        let mut tables = self.write();
        let session = tables.sessions.remove(&id)?;
        tables.names.remove(&session.username);

        info!(
            "Client unregistered: {} ({}) was {}",
            session.id, session.addr, session.username
        );
        debug!("Total clients: {}", tables.sessions.len());
        Some(session)
    }

    /// Change the username of a registered connection
    ///
    /// Returns the old name. On success a `username_change` message is
    /// enqueued on the broadcast queue inside the same critical section as
    /// the swap, using a slot reserved beforehand.
    pub async fn rename(
        &self,
        id: ConnectionId,
        new_name: &str,
        hub: &HubHandle,
    ) -> Result<String, AppError> {
        if !username::validate(new_name) {
            return Err(ValidationError::InvalidFormat.into());
        }

        let permit = hub.reserve().await?;

        let mut tables = self.write();
        let Tables { sessions, names } = &mut *tables;

        if names.contains_key(new_name) {
            return Err(ValidationError::Taken.into());
        }
        let Some(session) = sessions.get_mut(&id) else {
            return Err(ValidationError::NotRegistered.into());
        };

        let old_name = std::mem::replace(&mut session.username, new_name.to_string());
        names.remove(&old_name);
        names.insert(new_name.to_string(), id);
        permit.send(Message::username_change(&old_name, new_name, id));

        info!("Username changed: {} -> {}", old_name, new_name);
        Ok(old_name)
    }

    /// Visit every registered session except `excluding`
    ///
    /// `f` runs under the read lock: it must not block or touch the registry.
    pub fn for_each_other<F>(&self, excluding: Option<ConnectionId>, mut f: F)
    where
        F: FnMut(&Session),
    {
        let tables = self.read();
        tables
            .sessions
            .values()
            .filter(|session| Some(session.id) != excluding)
            .for_each(|session| f(session));
    }

    #[cfg(test)]
    fn username_of(&self, id: ConnectionId) -> Option<String> {
        self.read()
            .sessions
            .get(&id)
            .map(|session| session.username.clone())
    }

    /// Number of registered sessions
    pub fn count(&self) -> usize {
        self.read().sessions.len()
    }
}
