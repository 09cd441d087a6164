//! Transport layer: serves chat sessions over WebSocket.
//!
//! ## Endpoints
//!
//! - `GET /` - WebSocket upgrade; each connection is one chat session
//! - `GET /health` - Health check
//!
//! ## Example
//!
//! ```no_run
//! use chat_relay::server::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> chat_relay::Result<()> {
//!     serve(ServerConfig::new("127.0.0.1", 8888)).await
//! }
//! ```

pub mod router;
pub mod websocket;

pub use router::{
    create_router, create_router_with_state, health, serve, serve_with_state, AppState,
    ServerConfig,
};
