//! Outbound half of a session's channel.

use tokio::sync::mpsc;

use crate::error::ChatRelayError;
use crate::Result;

/// Outbound text channel owned by exactly one session.
///
/// Lines are queued to a writer task that owns the transport sink. When that
/// task stops (peer gone, write failure) the queue closes, which is what
/// [`Outbox::is_open`] reports. Liveness is queried, never cached.
#[derive(Debug)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
}

impl Outbox {
    /// Create an outbox and the receiver its writer task drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue one line for delivery.
    pub fn send(&self, line: impl Into<String>) -> Result<()> {
        self.tx
            .send(line.into())
            .map_err(|_| ChatRelayError::ChannelClosed)
    }

    /// Whether the receiving side is still alive.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}
