//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request URI
//!     → session.rs (extract optional session identifier)
//!     → resolver.rs:
//!         sticky mapping hit + live handle → that handle
//!         otherwise → shared rotation → handle + persist mapping
//!     → Return: ProxyHandle or "no backend available"
//! ```
//!
//! # Design Decisions
//! - Sticky before rotation: established sessions are never rebalanced
//! - New sessions spread by rotation so assignment doesn't hot-spot the
//!   most recently announced backend

pub mod resolver;
pub mod session;

pub use resolver::Resolver;
pub use session::extract_session_id;
