//! Reactive failover on forwarding errors.
//!
//! # Responsibilities
//! - Stop routing new traffic to a backend the moment forwarding to it fails
//! - Clean the failed backend out of the shared registry, best-effort
//!
//! The caller owns the final step of the state machine: re-resolving and
//! retrying the original request exactly once. The one-hop bound keeps a
//! systemic outage from walking an eviction storm through the whole fleet.

use std::sync::Arc;

use crate::discovery::{Discovery, Node};
use crate::observability::metrics;
use crate::proxy::{ForwardError, ProxyRegistry};

/// React to a forwarding failure against `node`.
///
/// The local handle is dropped synchronously, before any I/O, so the retry
/// that follows cannot be routed back to the failed backend. Shared-registry
/// eviction runs in the background; its failure is logged, never escalated.
pub fn handle_failure(
    discovery: &Arc<dyn Discovery>,
    proxies: &ProxyRegistry,
    node: &Node,
    target: &str,
    error: &ForwardError,
) {
    tracing::error!(
        process_id = %node.process_id,
        address = %node.address,
        target = %target,
        %error,
        "Forwarding failed, unregistering backend"
    );
    metrics::record_failover(&node.process_id);

    proxies.unregister(&node.process_id);

    let discovery = discovery.clone();
    let node = node.clone();
    tokio::spawn(async move {
        match discovery.evict(&node).await {
            Ok(()) => {
                tracing::info!(process_id = %node.process_id, "Evicted backend from shared registry");
            }
            Err(error) => {
                tracing::warn!(
                    process_id = %node.process_id,
                    %error,
                    "Best-effort eviction failed"
                );
            }
        }
    });
}
