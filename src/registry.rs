//! Shared directory of live sessions and message router.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::ChatRelayError;
use crate::protocol;
use crate::session::{Outbox, Session, SessionHandle, SessionId};
use crate::Result;

/// Thread-safe registry of connected sessions.
///
/// Sessions are kept in insertion order. Every cross-session effect
/// (uniqueness checks, broadcast, private delivery) goes through here.
pub struct Registry {
    sessions: RwLock<Vec<Arc<SessionHandle>>>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Arc<SessionHandle>>>> {
        self.sessions
            .read()
            .map_err(|_| ChatRelayError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Arc<SessionHandle>>>> {
        self.sessions
            .write()
            .map_err(|_| ChatRelayError::LockPoisoned)
    }

    /// Accept a new channel: create its session and register it.
    ///
    /// The returned session unregisters itself when it is dropped.
    pub fn open_session(self: &Arc<Self>, outbox: Outbox) -> Result<Session> {
        let handle = Arc::new(SessionHandle::new(outbox));
        self.register(Arc::clone(&handle))?;
        Ok(Session::new(Arc::clone(self), handle))
    }

    /// Add a session. Does nothing if it is already present.
    pub fn register(&self, session: Arc<SessionHandle>) -> Result<()> {
        let mut sessions = self.write()?;
        if sessions.iter().any(|s| s.id() == session.id()) {
            return Ok(());
        }

        sessions.push(session);
        info!("New client connected. Total: {}", sessions.len());
        Ok(())
    }

    /// Remove a session if present.
    ///
    /// Always succeeds: removal also goes through when the lock is poisoned,
    /// since it runs during teardown.
    pub fn unregister(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let index = sessions.iter().position(|s| s.id() == id)?;
        let removed = sessions.remove(index);
        info!(
            "Client {} disconnected. Remaining {} active.",
            removed.identity().as_deref().unwrap_or("(unnamed)"),
            sessions.len()
        );
        Some(removed)
    }

    /// Check whether a session is registered.
    pub fn contains(&self, id: SessionId) -> Result<bool> {
        Ok(self.read()?.iter().any(|s| s.id() == id))
    }

    /// True if no registered session is named `candidate`.
    pub fn is_name_available(&self, candidate: &str) -> Result<bool> {
        Ok(!self.read()?.iter().any(|s| s.is_named(candidate)))
    }

    /// Claim `name` for `session` if no registered session holds it.
    ///
    /// The check and the assignment happen under the exclusive lock, so two
    /// concurrent claims for the same name cannot both succeed.
    pub fn claim_name(&self, session: &SessionHandle, name: &str) -> Result<bool> {
        let sessions = self.write()?;
        if sessions.iter().any(|s| s.is_named(name)) {
            return Ok(false);
        }

        session.set_identity(name.to_string());
        Ok(true)
    }

    /// Deliver `[ALL] <sender> >> <text>` to every other open session.
    ///
    /// A failed send to one recipient does not stop the others. Returns the
    /// number of sessions reached.
    pub fn broadcast_except(&self, sender: &SessionHandle, text: &str) -> Result<usize> {
        let origin = sender.identity().unwrap_or_default();
        let line = protocol::broadcast(&origin, text);
        let sessions = self.read()?;

        let mut delivered = 0;
        for recipient in sessions.iter() {
            if recipient.id() == sender.id() || !recipient.is_open() {
                continue;
            }
            match recipient.send(line.as_str()) {
                Ok(()) => {
                    debug!(from = %sender.id(), to = %recipient.id(), "broadcast delivered");
                    delivered += 1;
                }
                Err(e) => debug!(to = %recipient.id(), error = %e, "broadcast skipped"),
            }
        }
        Ok(delivered)
    }

    /// Deliver `[PRIVATE] <sender> >> <text>` to the first open session
    /// named `target` other than the sender.
    ///
    /// Returns `false` if no such session could be reached.
    pub fn deliver_to(&self, sender: &SessionHandle, text: &str, target: &str) -> Result<bool> {
        let origin = sender.identity().unwrap_or_default();
        let sessions = self.read()?;

        for recipient in sessions.iter() {
            if recipient.id() == sender.id() || !recipient.is_open() || !recipient.is_named(target)
            {
                continue;
            }
            match recipient.send(protocol::private(&origin, text)) {
                Ok(()) => {
                    debug!(from = %sender.id(), to = %recipient.id(), "private delivered");
                    return Ok(true);
                }
                Err(e) => debug!(to = %recipient.id(), error = %e, "private delivery failed"),
            }
        }
        Ok(false)
    }

    /// Number of registered sessions.
    ///
    /// Counts through a poisoned lock, like [`Registry::unregister`].
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
