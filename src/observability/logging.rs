//! Structured logging initialization.
//!
//! Log level comes from the config, but `RUST_LOG` wins when set so a
//! deployment can turn on debug routing decisions without a config change.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber. Call once, before anything logs.
pub fn init_logging(log_level: &str) {
    let default_filter = format!("room_gateway={log_level},tower_http={log_level}");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
