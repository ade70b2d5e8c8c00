//! HTTP→HTTPS redirect responder.
//!
//! In HTTPS mode a secondary plain-HTTP listener answers every request with
//! a permanent redirect to the same host and path over https.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Router answering everything with a 301 to https.
pub fn router() -> Router {
    Router::new().fallback(redirect_handler)
}

/// Bind and serve the redirect responder in the background.
pub fn spawn(bind_address: String, mut shutdown: broadcast::Receiver<()>) {
    tokio::spawn(async move {
        let listener = match TcpListener::bind(&bind_address).await {
            Ok(listener) => listener,
            Err(error) => {
                tracing::error!(address = %bind_address, %error, "Failed to bind redirect responder");
                return;
            }
        };
        tracing::info!(address = %bind_address, "Redirect responder listening (http -> https)");

        let result = axum::serve(listener, router().into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await;
        if let Err(error) = result {
            tracing::error!(%error, "Redirect responder failed");
        }
    });
}

async fn redirect_handler(request: Request<Body>) -> Response {
    let Some(host) = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let location = format!("https://{}{}", host, request.uri());
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}
