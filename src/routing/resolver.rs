//! Routing decision engine.
//!
//! # Responsibilities
//! - Pin session-addressed requests to their established backend
//! - Spread everything else via the shared rotating selector
//! - Persist new session assignments for future stickiness
//!
//! # Design Decisions
//! - Sticky lookup runs before load balancing so an established session is
//!   never rebalanced just because rotation advanced
//! - A sticky mapping without a live local handle is a miss: the request
//!   falls through to rotation and the stale mapping is overwritten

use std::sync::Arc;

use axum::http::Uri;

use crate::discovery::{Discovery, RegistryError};
use crate::proxy::{ProxyHandle, ProxyRegistry};
use crate::routing::session;

/// Decides which backend handle serves an inbound request.
pub struct Resolver {
    discovery: Arc<dyn Discovery>,
    proxies: Arc<ProxyRegistry>,
}

impl Resolver {
    pub fn new(discovery: Arc<dyn Discovery>, proxies: Arc<ProxyRegistry>) -> Self {
        Self { discovery, proxies }
    }

    /// Resolve the handle for a request target, or `None` when no backend
    /// is available. Registry connectivity failures bubble up so callers
    /// can tell an unreachable registry apart from an empty fleet.
    pub async fn resolve(&self, uri: &Uri) -> Result<Option<Arc<ProxyHandle>>, RegistryError> {
        let session_id = session::extract_session_id(uri);

        if let Some(session_id) = session_id {
            if let Some(process_id) = self.discovery.sticky_target(session_id).await? {
                if let Some(handle) = self.proxies.lookup(&process_id) {
                    tracing::debug!(
                        session = %session_id,
                        process_id = %process_id,
                        "Sticky hit"
                    );
                    return Ok(Some(handle));
                }
                tracing::debug!(
                    session = %session_id,
                    process_id = %process_id,
                    "Stale sticky target, falling back to rotation"
                );
            }
        }

        let Some(process_id) = self.discovery.next_rotation().await? else {
            return Ok(None);
        };

        // Membership and local handles sync through discovery events; a
        // just-announced node may not have a handle yet.
        let Some(handle) = self.proxies.lookup(&process_id) else {
            tracing::debug!(process_id = %process_id, "Rotation chose a node with no local handle");
            return Ok(None);
        };

        if let Some(session_id) = session_id {
            self.discovery
                .set_sticky_target(session_id, &process_id)
                .await?;
            tracing::debug!(
                session = %session_id,
                process_id = %process_id,
                "Assigned session to backend"
            );
        } else {
            tracing::debug!(process_id = %process_id, uri = %uri, "Rotation pick");
        }

        Ok(Some(handle))
    }
}
