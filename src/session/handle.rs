//! Registry-visible part of a session.

use std::sync::RwLock;

use super::{Outbox, SessionId};
use crate::Result;

/// The part of a session the registry routes to: its id, its claimed
/// nickname, and its outbound channel.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    identity: RwLock<Option<String>>,
    outbox: Outbox,
}

impl SessionHandle {
    /// Create an unidentified handle around an outbound channel.
    pub fn new(outbox: Outbox) -> Self {
        Self {
            id: SessionId::new(),
            identity: RwLock::new(None),
            outbox,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Claimed nickname, if any.
    pub fn identity(&self) -> Option<String> {
        self.identity.read().map(|name| name.clone()).unwrap_or(None)
    }

    /// Whether this session currently holds exactly `name`.
    pub fn is_named(&self, name: &str) -> bool {
        self.identity
            .read()
            .map(|current| current.as_deref() == Some(name))
            .unwrap_or(false)
    }

    /// Replace the nickname.
    ///
    /// Only the registry calls this, while holding its exclusive lock, so the
    /// uniqueness check and the assignment cannot interleave with another
    /// claim.
    pub(crate) fn set_identity(&self, name: String) {
        match self.identity.write() {
            Ok(mut current) => *current = Some(name),
            Err(poisoned) => *poisoned.into_inner() = Some(name),
        }
    }

    /// Whether the outbound channel is still open.
    pub fn is_open(&self) -> bool {
        self.outbox.is_open()
    }

    /// Send one line to this session's client.
    pub fn send(&self, line: impl Into<String>) -> Result<()> {
        self.outbox.send(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_handle_is_unidentified() {
        let (outbox, _rx) = Outbox::channel();
        let handle = SessionHandle::new(outbox);

        assert!(handle.identity().is_none());
        assert!(!handle.is_named(""));
        assert!(handle.is_open());
    }

    #[test]
    fn test_set_identity() {
        let (outbox, _rx) = Outbox::channel();
        let handle = SessionHandle::new(outbox);

        handle.set_identity("alice".into());
        assert_eq!(handle.identity().as_deref(), Some("alice"));
        assert!(handle.is_named("alice"));
        assert!(!handle.is_named("bob"));
    }

    #[test]
    fn test_distinct_ids() {
        let (a, _rx_a) = Outbox::channel();
        let (b, _rx_b) = Outbox::channel();
        assert_ne!(SessionHandle::new(a).id(), SessionHandle::new(b).id());
    }
}
