//! Session management module.
//!
//! A session is one connected client. Its routable part
//! ([`SessionHandle`]) lives in the registry; its command loop
//! ([`Session`]) runs in the connection's own task.

mod handle;
mod handler;
mod id;
mod outbox;
mod state;

pub use handle::SessionHandle;
pub use handler::Session;
pub use id::SessionId;
pub use outbox::Outbox;
pub use state::SessionState;
