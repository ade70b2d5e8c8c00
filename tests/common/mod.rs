//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use room_gateway::config::GatewayConfig;
use room_gateway::discovery::{Discovery, DiscoveryEvent, Node, RegistryError};
use room_gateway::http::GatewayServer;
use room_gateway::lifecycle::Shutdown;

/// In-memory stand-in for the shared discovery registry.
pub struct StaticDiscovery {
    members: Mutex<Vec<Node>>,
    counter: AtomicUsize,
    sticky: Mutex<HashMap<String, String>>,
    evicted: Mutex<Vec<String>>,
}

impl StaticDiscovery {
    pub fn new(members: Vec<Node>) -> Self {
        Self {
            members: Mutex::new(members),
            counter: AtomicUsize::new(0),
            sticky: Mutex::new(HashMap::new()),
            evicted: Mutex::new(Vec::new()),
        }
    }

    pub fn sticky_of(&self, session_id: &str) -> Option<String> {
        self.sticky.lock().unwrap().get(session_id).cloned()
    }

    pub fn evicted(&self) -> Vec<String> {
        self.evicted.lock().unwrap().clone()
    }

    /// Announce a node, as a backend would (membership + event are updated
    /// together in the real registry).
    pub fn add_member(&self, node: Node) {
        self.members.lock().unwrap().push(node);
    }

    /// Withdraw a node from membership.
    pub fn remove_member(&self, process_id: &str) {
        self.members
            .lock()
            .unwrap()
            .retain(|member| member.process_id != process_id);
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn list_members(&self) -> Result<Vec<Node>, RegistryError> {
        Ok(self.members.lock().unwrap().clone())
    }

    async fn next_rotation(&self) -> Result<Option<String>, RegistryError> {
        let members = self.members.lock().unwrap();
        if members.is_empty() {
            return Ok(None);
        }
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % members.len();
        Ok(Some(members[index].process_id.clone()))
    }

    async fn evict(&self, node: &Node) -> Result<(), RegistryError> {
        self.members
            .lock()
            .unwrap()
            .retain(|member| member.process_id != node.process_id);
        self.evicted.lock().unwrap().push(node.process_id.clone());
        Ok(())
    }

    async fn sticky_target(&self, session_id: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.sticky_of(session_id))
    }

    async fn set_sticky_target(
        &self,
        session_id: &str,
        process_id: &str,
    ) -> Result<(), RegistryError> {
        self.sticky
            .lock()
            .unwrap()
            .insert(session_id.to_string(), process_id.to_string());
        Ok(())
    }
}

/// Spawn a gateway over an in-memory registry. Returns the registry (for
/// assertions), the discovery-event sender, and the shutdown coordinator.
pub async fn spawn_gateway(
    proxy_addr: SocketAddr,
    members: Vec<Node>,
) -> (
    Arc<StaticDiscovery>,
    mpsc::UnboundedSender<DiscoveryEvent>,
    Shutdown,
) {
    let discovery = Arc::new(StaticDiscovery::new(members));
    let injected: Arc<dyn Discovery> = discovery.clone();

    let config = GatewayConfig::default();
    let server = GatewayServer::new(&config, injected);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let listener = TcpListener::bind(proxy_addr).await.unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, events_rx, server_shutdown).await;
    });

    (discovery, events_tx, shutdown)
}

/// Start a simple mock backend that answers every request with a fixed body.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a WebSocket backend that echoes every message back.
pub async fn start_ws_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        let Ok(stream) = tokio_tungstenite::accept_async(socket).await else {
                            return;
                        };
                        let (mut sink, mut source) = stream.split();
                        while let Some(Ok(message)) = source.next().await {
                            if message.is_close() {
                                break;
                            }
                            if sink.send(message).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}
