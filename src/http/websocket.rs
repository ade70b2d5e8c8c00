//! WebSocket relaying between client and backend.
//!
//! # Responsibilities
//! - Bidirectional frame forwarding (no message buffering)
//! - Idle-socket enforcement: no frame in either direction within the
//!   configured window force-closes both sides
//!
//! # Data Flow
//! ```text
//! Client ←── WebSocket frames ──→ Gateway ←── WebSocket frames ──→ Backend
//! ```

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as BackendCloseFrame;
use tokio_tungstenite::tungstenite::Message as BackendMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::discovery::Node;

/// Shuttle frames between an upgraded client socket and the backend
/// connection until either side closes, errors, or goes idle.
pub async fn relay(
    client: WebSocket,
    backend: WebSocketStream<MaybeTlsStream<TcpStream>>,
    node: Node,
    idle_timeout: Duration,
) {
    let (mut client_sink, mut client_stream) = client.split();
    let (mut backend_sink, mut backend_stream) = backend.split();

    loop {
        tokio::select! {
            message = client_stream.next() => {
                match message {
                    Some(Ok(message)) => {
                        let is_close = matches!(message, Message::Close(_));
                        if backend_sink.send(client_to_backend(message)).await.is_err() || is_close {
                            break;
                        }
                    }
                    Some(Err(error)) => {
                        tracing::debug!(node = %node, %error, "Client socket error");
                        break;
                    }
                    None => break,
                }
            }
            message = backend_stream.next() => {
                match message {
                    Some(Ok(message)) => {
                        let is_close = matches!(message, BackendMessage::Close(_));
                        let Some(message) = backend_to_client(message) else { continue };
                        if client_sink.send(message).await.is_err() || is_close {
                            break;
                        }
                    }
                    Some(Err(error)) => {
                        tracing::debug!(node = %node, %error, "Backend socket error");
                        break;
                    }
                    None => break,
                }
            }
            _ = tokio::time::sleep(idle_timeout) => {
                tracing::info!(node = %node, "Socket timed out, force-closing");
                break;
            }
        }
    }

    let _ = client_sink.close().await;
    let _ = backend_sink.close().await;
}

fn client_to_backend(message: Message) -> BackendMessage {
    match message {
        Message::Text(text) => BackendMessage::Text(text.as_str().into()),
        Message::Binary(data) => BackendMessage::Binary(data),
        Message::Ping(data) => BackendMessage::Ping(data),
        Message::Pong(data) => BackendMessage::Pong(data),
        Message::Close(frame) => BackendMessage::Close(frame.map(|frame| BackendCloseFrame {
            code: CloseCode::from(frame.code),
            reason: frame.reason.as_str().into(),
        })),
    }
}

fn backend_to_client(message: BackendMessage) -> Option<Message> {
    match message {
        BackendMessage::Text(text) => Some(Message::Text(text.as_str().into())),
        BackendMessage::Binary(data) => Some(Message::Binary(data)),
        BackendMessage::Ping(data) => Some(Message::Ping(data)),
        BackendMessage::Pong(data) => Some(Message::Pong(data)),
        BackendMessage::Close(frame) => Some(Message::Close(frame.map(|frame| CloseFrame {
            code: frame.code.into(),
            reason: frame.reason.as_str().into(),
        }))),
        // raw frames never surface from a handshaked client stream
        BackendMessage::Frame(_) => None,
    }
}
