//! Shared discovery registry backed by Redis.
//!
//! # Responsibilities
//! - Snapshot fleet membership from the shared node set
//! - Advance the rotating selector in a single atomic round-trip
//! - Stream membership changes from the discovery channel into the gateway
//! - Evict failed nodes and their auxiliary state
//! - Read/write sticky session-to-process mappings
//!
//! # Design Decisions
//! - The registry client is constructed explicitly and injected; there is no
//!   module-level connection singleton
//! - Rotation runs as a server-side Lua script so concurrent gateway
//!   instances each observe exactly one advancement
//! - Subscribers get an mpsc channel, not a callback; dropping the receiver
//!   cancels the subscription pump

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::RegistryConfig;
use crate::discovery::node::{DiscoveryEvent, Node};

/// Hash of per-process room counters maintained by the backends themselves.
/// The key is fixed by the backend wire contract, not namespaced.
const ROOM_COUNT_KEY: &str = "roomcount";

/// Selects the next member of the node set, advancing the shared rotation
/// counter atomically. Returns the `processId` prefix of the selected entry,
/// or an empty string when the fleet is empty.
const NEXT_ROTATION_SCRIPT: &str = r#"
local nodes = redis.call('SMEMBERS', KEYS[1])
if #nodes == 0 then
    return ''
end
local idx = (redis.call('INCR', KEYS[2]) - 1) % #nodes
return string.match(nodes[idx + 1], '(.*)/')
"#;

/// Error type for shared-registry operations.
///
/// Connectivity failures must stay distinguishable from an empty fleet:
/// routing treats both as "no backend", but only one of them should page
/// anybody.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("shared registry unreachable: {0}")]
    Unavailable(#[from] redis::RedisError),
}

/// Membership, rotation, and sticky-mapping operations of the shared registry.
///
/// `RedisDiscovery` implements this against Redis; tests substitute in-memory
/// fakes.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Snapshot of current membership. Malformed entries are skipped.
    async fn list_members(&self) -> Result<Vec<Node>, RegistryError>;

    /// Atomically advance the rotating selector and return the `processId`
    /// at the resulting index, or `None` while the fleet is empty.
    async fn next_rotation(&self) -> Result<Option<String>, RegistryError>;

    /// Remove a node from shared membership along with its auxiliary state.
    /// Evicting an already-absent node is a no-op.
    async fn evict(&self, node: &Node) -> Result<(), RegistryError>;

    /// Look up the sticky mapping for a session identifier.
    async fn sticky_target(&self, session_id: &str) -> Result<Option<String>, RegistryError>;

    /// Persist a sticky mapping. No expiry is applied at this layer.
    async fn set_sticky_target(
        &self,
        session_id: &str,
        process_id: &str,
    ) -> Result<(), RegistryError>;
}

/// Key layout under the configured namespace.
///
/// The node set and discovery channel are shared with the backends; the
/// rotation counter and sticky keys are gateway-private.
#[derive(Debug, Clone)]
struct Keys {
    nodes_set: String,
    discovery_channel: String,
    rotation_counter: String,
    sticky_prefix: String,
}

impl Keys {
    fn new(namespace: &str) -> Self {
        Self {
            nodes_set: format!("{namespace}:nodes"),
            discovery_channel: format!("{namespace}:nodes:discovery"),
            rotation_counter: format!("{namespace}:rotation"),
            sticky_prefix: format!("{namespace}:sticky"),
        }
    }

    fn sticky(&self, session_id: &str) -> String {
        format!("{}:{}", self.sticky_prefix, session_id)
    }
}

/// Redis-backed implementation of the discovery registry.
pub struct RedisDiscovery {
    client: redis::Client,
    connection: ConnectionManager,
    keys: Keys,
    rotation: Script,
}

impl RedisDiscovery {
    /// Connect to the shared registry. The connection manager reconnects on
    /// its own; individual operations fail with `Unavailable` while the
    /// registry is unreachable.
    pub async fn connect(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection = client.get_connection_manager().await?;

        tracing::info!(
            url = %config.url,
            namespace = %config.namespace,
            "Connected to shared discovery registry"
        );

        Ok(Self {
            client,
            connection,
            keys: Keys::new(&config.namespace),
            rotation: Script::new(NEXT_ROTATION_SCRIPT),
        })
    }

    /// Subscribe to membership changes.
    ///
    /// Events arrive in publish order on the returned channel. There is no
    /// replay of missed events: callers must reconcile with `list_members`
    /// after subscribing. Dropping the receiver ends the pump task.
    pub async fn subscribe(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<DiscoveryEvent>, RegistryError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.keys.discovery_channel).await?;

        let channel = self.keys.discovery_channel.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(message) = messages.next().await {
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(error) => {
                        tracing::warn!(channel = %channel, %error, "Undecodable discovery message");
                        continue;
                    }
                };
                match DiscoveryEvent::parse(&payload) {
                    Some(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    None => {
                        tracing::warn!(channel = %channel, payload = %payload, "Malformed discovery message");
                    }
                }
            }
            tracing::debug!(channel = %channel, "Discovery subscription ended");
        });

        Ok(rx)
    }
}

#[async_trait]
impl Discovery for RedisDiscovery {
    async fn list_members(&self) -> Result<Vec<Node>, RegistryError> {
        let mut connection = self.connection.clone();
        let entries: Vec<String> = connection.smembers(&self.keys.nodes_set).await?;

        let mut nodes = Vec::with_capacity(entries.len());
        for entry in entries {
            match Node::parse(&entry) {
                Some(node) => nodes.push(node),
                None => tracing::warn!(entry = %entry, "Skipping malformed membership entry"),
            }
        }
        Ok(nodes)
    }

    async fn next_rotation(&self) -> Result<Option<String>, RegistryError> {
        let mut connection = self.connection.clone();
        let process_id: String = self
            .rotation
            .key(&self.keys.nodes_set)
            .key(&self.keys.rotation_counter)
            .invoke_async(&mut connection)
            .await?;

        if process_id.is_empty() {
            Ok(None)
        } else {
            Ok(Some(process_id))
        }
    }

    async fn evict(&self, node: &Node) -> Result<(), RegistryError> {
        let mut connection = self.connection.clone();
        let _: () = connection.srem(&self.keys.nodes_set, node.entry()).await?;
        let _: () = connection.hdel(ROOM_COUNT_KEY, &node.process_id).await?;
        Ok(())
    }

    async fn sticky_target(&self, session_id: &str) -> Result<Option<String>, RegistryError> {
        let mut connection = self.connection.clone();
        let target: Option<String> = connection.get(self.keys.sticky(session_id)).await?;
        Ok(target)
    }

    async fn set_sticky_target(
        &self,
        session_id: &str,
        process_id: &str,
    ) -> Result<(), RegistryError> {
        let mut connection = self.connection.clone();
        let _: () = connection
            .set(self.keys.sticky(session_id), process_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let keys = Keys::new("gateway");
        assert_eq!(keys.nodes_set, "gateway:nodes");
        assert_eq!(keys.discovery_channel, "gateway:nodes:discovery");
        assert_eq!(keys.rotation_counter, "gateway:rotation");
        assert_eq!(keys.sticky("abc123"), "gateway:sticky:abc123");
    }
}
