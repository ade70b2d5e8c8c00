//! Local table of live forwarding handles.
//!
//! # Responsibilities
//! - Map a backend's `processId` to its forwarding handle
//! - Create handles on discovery `add`, destroy them on `remove`/eviction
//!
//! # Design Decisions
//! - Mutated only by the discovery control loop and the failover handler;
//!   the concurrent map is the explicit mutual-exclusion discipline
//! - Registration is idempotent: duplicate announcements of a process keep
//!   the original handle

use std::sync::Arc;

use axum::body::Body;
use dashmap::DashMap;
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::discovery::Node;
use crate::observability::metrics;
use crate::proxy::handle::ProxyHandle;

/// Owns every live `ProxyHandle`, keyed by `processId`.
pub struct ProxyRegistry {
    client: Client<HttpConnector, Body>,
    handles: DashMap<String, Arc<ProxyHandle>>,
}

impl ProxyRegistry {
    /// Create an empty registry. All handles share `client` for keep-alive
    /// connection pooling toward the backends.
    pub fn new(client: Client<HttpConnector, Body>) -> Self {
        Self {
            client,
            handles: DashMap::new(),
        }
    }

    /// Install a handle for `node`. Idempotent: an already-registered
    /// `processId` is left untouched.
    pub fn register(&self, node: &Node) {
        let authority = match node.address.parse() {
            Ok(authority) => authority,
            Err(error) => {
                tracing::warn!(node = %node, %error, "Ignoring node with unusable address");
                return;
            }
        };

        let mut inserted = false;
        self.handles
            .entry(node.process_id.clone())
            .or_insert_with(|| {
                inserted = true;
                Arc::new(ProxyHandle::new(node.clone(), authority, self.client.clone()))
            });

        if inserted {
            tracing::info!(node = %node, backends = self.handles.len(), "Registered backend");
            metrics::record_backend_count(self.handles.len());
        }
    }

    /// Drop the local handle for `process_id`, if present. Shared registry
    /// state is untouched; that cleanup belongs to eviction.
    pub fn unregister(&self, process_id: &str) {
        if self.handles.remove(process_id).is_some() {
            tracing::info!(
                process_id = %process_id,
                backends = self.handles.len(),
                "Unregistered backend"
            );
            metrics::record_backend_count(self.handles.len());
        }
    }

    pub fn lookup(&self, process_id: &str) -> Option<Arc<ProxyHandle>> {
        self.handles.get(process_id).map(|entry| entry.value().clone())
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
