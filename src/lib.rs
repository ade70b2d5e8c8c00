//! Session-sticky gateway for stateful backend fleets.

pub mod config;
pub mod discovery;
pub mod failover;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
