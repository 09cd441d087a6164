//! # chat-relay
//!
//! Real-time text chat relay over WebSocket.
//!
//! Clients connect, claim a unique nickname with `/name`, and exchange
//! broadcast or private messages routed by the server.
//!
//! ## Features
//!
//! - **Registry**: concurrency-safe directory of live sessions with atomic
//!   nickname claims, broadcast and private delivery
//! - **Sessions**: one task per connection, exactly-once teardown
//! - **Line protocol**: `/commands` with shell-style quoting
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use chat_relay::{Outbox, Registry};
//!
//! # fn main() -> chat_relay::Result<()> {
//! let registry = Arc::new(Registry::new());
//!
//! let (outbox, mut rx) = Outbox::channel();
//! let mut session = registry.open_session(outbox)?;
//! session.handle_line("/name alice")?;
//!
//! assert_eq!(
//!     rx.try_recv().unwrap(),
//!     "Successfully changed nickname to alice"
//! );
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use error::{ChatRelayError, Result};
pub use protocol::{Command, Input};
pub use registry::Registry;
pub use session::{Outbox, Session, SessionHandle, SessionId, SessionState};
