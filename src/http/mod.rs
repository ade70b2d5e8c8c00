//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → routing layer decides backend (sticky, else rotation)
//!     → plain request: forward via ProxyHandle, retry once on failure
//!     → upgrade: websocket.rs relays frames to the backend
//!
//! HTTPS mode adds redirect.rs on the plain port.
//! ```

pub mod redirect;
pub mod server;
pub mod websocket;

pub use server::{AppState, GatewayServer};
