//! Discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Backends announce/withdraw themselves in the shared registry:
//!     "<ns>:nodes" set          → list_members() snapshot at startup
//!     "<ns>:nodes:discovery"    → subscribe() stream of add/remove events
//!
//! The gateway consumes:
//!     next_rotation()           → shared round-robin cursor (atomic Lua)
//!     sticky_target()/set_...() → session pinning
//!     evict()                   → reactive removal on forwarding failure
//! ```
//!
//! # Design Decisions
//! - Cross-instance correctness relies on registry atomicity, never on
//!   in-process locks
//! - Connectivity failure is a distinct error, not an empty fleet

pub mod node;
pub mod registry;

pub use node::{Action, DiscoveryEvent, Node};
pub use registry::{Discovery, RedisDiscovery, RegistryError};
