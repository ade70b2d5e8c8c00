//! Per-node forwarding handle.
//!
//! # Responsibilities
//! - Bind one backend's authority for request forwarding
//! - Rewrite inbound URIs onto the backend and relay the response
//! - Open WebSocket connections to the backend for upgrade relaying
//!
//! # Design Decisions
//! - All handles share one keep-alive client; pooling happens per authority
//!   inside the client, so a handle is cheap and carries no sockets itself
//! - Handles are local and ephemeral: rebuilt from the membership snapshot
//!   on restart, never persisted

use axum::body::Body;
use axum::http::uri::{PathAndQuery, Scheme};
use axum::http::{request, Request, Response, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::discovery::Node;

/// Error type for forwarding through a handle.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream request failed: {0}")]
    Http(#[from] hyper_util::client::legacy::Error),

    #[error("websocket connect to backend failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Local forwarding target bound to one backend node.
pub struct ProxyHandle {
    node: Node,
    authority: axum::http::uri::Authority,
    client: Client<HttpConnector, Body>,
}

impl ProxyHandle {
    pub fn new(
        node: Node,
        authority: axum::http::uri::Authority,
        client: Client<HttpConnector, Body>,
    ) -> Self {
        Self {
            node,
            authority,
            client,
        }
    }

    /// The node this handle forwards to.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Forward a buffered request to the backend and stream the response.
    ///
    /// Headers are relayed as received; the request-id header is already
    /// present courtesy of the server middleware.
    pub async fn forward(
        &self,
        parts: &request::Parts,
        body: axum::body::Bytes,
    ) -> Result<Response<Body>, ForwardError> {
        let mut builder = Request::builder()
            .method(parts.method.clone())
            .uri(self.rewrite_uri(&parts.uri));

        if let Some(headers) = builder.headers_mut() {
            for (name, value) in parts.headers.iter() {
                headers.insert(name.clone(), value.clone());
            }
        }

        let request = builder
            .body(Body::from(body))
            .unwrap_or_else(|_| Request::new(Body::empty()));

        let response = self.client.request(request).await?;
        Ok(response.map(Body::new))
    }

    /// Open a WebSocket connection to the backend for the given target.
    pub async fn connect_ws(
        &self,
        path_and_query: &str,
    ) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>, ForwardError> {
        let url = format!("ws://{}{}", self.node.address, path_and_query);
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(stream)
    }

    /// Rebase the inbound URI onto this backend's authority.
    fn rewrite_uri(&self, uri: &Uri) -> Uri {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
    }
}
