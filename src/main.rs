//! room-gateway
//!
//! A stateless front-end gateway for fleets of stateful room/session
//! servers, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────────┐
//!                 │                     GATEWAY                        │
//!  Client ────────┼─▶ http::server ──▶ routing::resolver ──┐          │
//!                 │        │                │               ▼          │
//!                 │        │         discovery (Redis)  proxy::handle ─┼──▶ Backend
//!                 │        │          sticky + rotation     │          │
//!                 │        ▼                                │          │
//!                 │   failover ◀──── forwarding error ◀─────┘          │
//!                 │   (unregister, evict, retry once)                  │
//!                 └───────────────────────────────────────────────────┘
//! ```
//!
//! Backends announce themselves in the shared registry; the gateway spreads
//! first-time connections round-robin, pins established sessions to their
//! backend, and reactively evicts backends that fail at forwarding time.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use room_gateway::config::{from_env, load_config};
use room_gateway::discovery::{Discovery, RedisDiscovery};
use room_gateway::http::{redirect, GatewayServer};
use room_gateway::lifecycle::{signals, Shutdown};
use room_gateway::net::tls;
use room_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "room-gateway", version, about = "Sticky-session gateway for stateful backend fleets")]
struct Args {
    /// Path to the TOML configuration file. Without it, defaults plus
    /// environment overrides apply.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => from_env()?,
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("room-gateway v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        registry = %config.registry.url,
        namespace = %config.registry.namespace,
        socket_idle_secs = config.timeouts.socket_idle_secs,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(error) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                %error,
                "Failed to parse metrics address"
            ),
        }
    }

    // Subscribe before the startup membership sync: no events are replayed.
    let registry = Arc::new(RedisDiscovery::connect(&config.registry).await?);
    let events = registry.subscribe().await?;
    let discovery: Arc<dyn Discovery> = registry;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = GatewayServer::new(&config, discovery);

    match &config.listener.tls {
        Some(tls_config) => {
            let rustls = tls::load_tls_config(tls_config).await?;
            redirect::spawn(
                config.listener.redirect_bind_address.clone(),
                shutdown.subscribe(),
            );

            let addr: SocketAddr = config.listener.bind_address.parse()?;
            server.run_tls(addr, rustls, events, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, events, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
